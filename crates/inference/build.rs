use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=DLK_LIB_DIR");
    println!("cargo:rerun-if-env-changed=DLK_LIB_NAME");

    let link_dlk = std::env::var("CARGO_FEATURE_DLK").is_ok();

    if link_dlk {
        let lib_name = std::env::var("DLK_LIB_NAME").unwrap_or_else(|_| "dlk".to_string());

        if let Ok(lib_dir) = std::env::var("DLK_LIB_DIR") {
            let lib_dir = PathBuf::from(lib_dir);
            println!("cargo:rustc-link-search=native={}", lib_dir.display());
            // Let the binary find the shared kernel without LD_LIBRARY_PATH
            println!("cargo:rustc-link-arg=-Wl,-rpath,{}", lib_dir.display());
        }

        println!("cargo:rustc-link-lib=dylib={}", lib_name);
    }
}
