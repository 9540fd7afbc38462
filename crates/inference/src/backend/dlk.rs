//! Binding to the compiled network kernel's C ABI.

use super::NetworkBackend;
use crate::error::PredictorError;
use std::marker::{PhantomData, PhantomPinned};
use std::os::raw::c_int;
use std::ptr::NonNull;
use tensor::volume;

/// Networks deeper than this are treated as a corrupt shape query.
const MAX_RANK: usize = 8;

/// Opaque kernel-side network object.
#[repr(C)]
pub struct RawNetwork {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

#[cfg(feature = "dlk")]
mod ffi {
    use super::RawNetwork;
    use std::os::raw::c_int;

    unsafe extern "C" {
        pub fn network_create() -> *mut RawNetwork;
        pub fn network_delete(nn: *mut RawNetwork);
        pub fn network_init(nn: *mut RawNetwork) -> bool;
        pub fn network_get_input_rank(nn: *mut RawNetwork) -> c_int;
        pub fn network_get_output_rank(nn: *mut RawNetwork) -> c_int;
        pub fn network_get_input_shape(nn: *mut RawNetwork, shape: *mut c_int);
        pub fn network_get_output_shape(nn: *mut RawNetwork, shape: *mut c_int);
        pub fn network_run(nn: *mut RawNetwork, input: *mut f32, output: *mut f32);
    }
}

type RankFn = unsafe extern "C" fn(*mut RawNetwork) -> c_int;
type ShapeFn = unsafe extern "C" fn(*mut RawNetwork, *mut c_int);

/// Entry points of the kernel. The linked library provides one set; tests
/// provide their own.
#[derive(Clone, Copy)]
pub struct KernelApi {
    pub create: unsafe extern "C" fn() -> *mut RawNetwork,
    pub delete: unsafe extern "C" fn(*mut RawNetwork),
    pub init: unsafe extern "C" fn(*mut RawNetwork) -> bool,
    pub input_rank: RankFn,
    pub output_rank: RankFn,
    pub input_shape: ShapeFn,
    pub output_shape: ShapeFn,
    pub run: unsafe extern "C" fn(*mut RawNetwork, *mut f32, *mut f32),
}

impl KernelApi {
    #[cfg(feature = "dlk")]
    pub fn linked() -> Self {
        Self {
            create: ffi::network_create,
            delete: ffi::network_delete,
            init: ffi::network_init,
            input_rank: ffi::network_get_input_rank,
            output_rank: ffi::network_get_output_rank,
            input_shape: ffi::network_get_input_shape,
            output_shape: ffi::network_get_output_shape,
            run: ffi::network_run,
        }
    }
}

/// Owns a kernel network; deletes it on drop.
struct NetworkHandle {
    ptr: NonNull<RawNetwork>,
    delete: unsafe extern "C" fn(*mut RawNetwork),
}

impl NetworkHandle {
    fn create(api: &KernelApi) -> anyhow::Result<Self> {
        let raw = unsafe { (api.create)() };
        let ptr = NonNull::new(raw)
            .ok_or_else(|| anyhow::anyhow!("network_create returned a null handle"))?;
        Ok(Self {
            ptr,
            delete: api.delete,
        })
    }

    fn as_ptr(&self) -> *mut RawNetwork {
        self.ptr.as_ptr()
    }
}

impl Drop for NetworkHandle {
    fn drop(&mut self) {
        tracing::debug!("Deleting network handle");
        // SAFETY: ptr came from network_create and is deleted exactly once
        unsafe { (self.delete)(self.ptr.as_ptr()) };
    }
}

/// Network backed by the kernel library.
pub struct DlkNetwork {
    handle: NetworkHandle,
    api: KernelApi,
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    /// `network_run` takes a mutable input pointer, so the input is staged here.
    input_buffer: Vec<f32>,
}

// SAFETY: the kernel network has no thread affinity; `run` takes `&mut self`
// so calls are never concurrent.
unsafe impl Send for DlkNetwork {}

impl DlkNetwork {
    /// Creates and initializes a network through `api`, then captures its
    /// input and output shapes.
    pub fn load_with(api: KernelApi) -> anyhow::Result<Self> {
        let handle = NetworkHandle::create(&api)?;

        if !unsafe { (api.init)(handle.as_ptr()) } {
            anyhow::bail!("network_init failed");
        }

        let input_shape = query_shape(&handle, "input", api.input_rank, api.input_shape)?;
        let output_shape = query_shape(&handle, "output", api.output_rank, api.output_shape)?;

        tracing::info!(
            input_shape = ?input_shape,
            output_shape = ?output_shape,
            "Network initialized"
        );

        Ok(Self {
            handle,
            api,
            input_buffer: vec![0.0; volume(&input_shape)],
            input_shape,
            output_shape,
        })
    }
}

fn query_shape(
    handle: &NetworkHandle,
    which: &'static str,
    rank_fn: RankFn,
    shape_fn: ShapeFn,
) -> anyhow::Result<Vec<usize>> {
    let rank = unsafe { rank_fn(handle.as_ptr()) };
    let rank = match usize::try_from(rank) {
        Ok(r) if (1..=MAX_RANK).contains(&r) => r,
        _ => {
            return Err(PredictorError::InvalidNetworkShape {
                which,
                shape: Vec::new(),
            }
            .into());
        }
    };

    let mut dims: Vec<c_int> = vec![0; rank];
    // SAFETY: dims holds `rank` slots, as reported by the kernel
    unsafe { shape_fn(handle.as_ptr(), dims.as_mut_ptr()) };

    let shape: Vec<usize> = dims
        .iter()
        .map(|&d| usize::try_from(d).unwrap_or(0))
        .collect();
    if shape.contains(&0) {
        return Err(PredictorError::InvalidNetworkShape { which, shape }.into());
    }
    Ok(shape)
}

impl NetworkBackend for DlkNetwork {
    fn load() -> anyhow::Result<Self> {
        #[cfg(feature = "dlk")]
        {
            Self::load_with(KernelApi::linked())
        }
        #[cfg(not(feature = "dlk"))]
        {
            anyhow::bail!("DlkNetwork needs the `dlk` feature to link the network kernel")
        }
    }

    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    fn run(&mut self, input: &[f32], output: &mut [f32]) -> anyhow::Result<()> {
        if input.len() != self.input_buffer.len() {
            anyhow::bail!(
                "Input buffer has {} values, network expects {}",
                input.len(),
                self.input_buffer.len()
            );
        }
        let output_len = volume(&self.output_shape);
        if output.len() != output_len {
            anyhow::bail!(
                "Output buffer has {} values, network produces {}",
                output.len(),
                output_len
            );
        }

        self.input_buffer.copy_from_slice(input);
        // SAFETY: both buffers match the volumes the kernel reported
        unsafe {
            (self.api.run)(
                self.handle.as_ptr(),
                self.input_buffer.as_mut_ptr(),
                output.as_mut_ptr(),
            )
        };
        Ok(())
    }
}
