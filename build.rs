//! dxbc-decomp Build Script
//!
//! Compiles the native shim around D3DCompiler and the HLSL decompiler and
//! links it as a static library when the native_decomp feature is enabled.

fn main() {
    println!("cargo:rerun-if-changed=native/dxbc_shim.cpp");
    println!("cargo:rerun-if-changed=native/dxbc_shim.h");
    println!("cargo:rerun-if-env-changed=DXBC_DECOMPILER_DIR");

    #[cfg(feature = "native_decomp")]
    {
        build_native_library();
    }

    #[cfg(not(feature = "native_decomp"))]
    {
        println!("cargo:warning=Native DXBC backends disabled. Using stub mode.");
        println!("cargo:warning=To enable: cargo build --features native_decomp");
    }
}

#[cfg(feature = "native_decomp")]
fn build_native_library() {
    use std::path::PathBuf;

    let shim_dir = PathBuf::from("native");
    let shim_src = shim_dir.join("dxbc_shim.cpp");

    // Root of the HLSL decompiler sources (DecompileHLSL.h and friends)
    let Some(decompiler_dir) = std::env::var_os("DXBC_DECOMPILER_DIR").map(PathBuf::from) else {
        panic!("native_decomp requires DXBC_DECOMPILER_DIR to point at the HLSL decompiler sources");
    };

    let decompiler_sources: Vec<PathBuf> = std::fs::read_dir(&decompiler_dir)
        .map(|dir| {
            dir.filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map(|ext| ext == "cpp").unwrap_or(false))
                .collect()
        })
        .unwrap_or_default();

    if decompiler_sources.is_empty() {
        panic!("No decompiler sources found in {}", decompiler_dir.display());
    }

    let mut build = cc::Build::new();

    build
        .cpp(true)
        .include(&shim_dir)
        .include(&decompiler_dir)
        .warnings(false)
        .extra_warnings(false);

    #[cfg(target_os = "windows")]
    {
        build.std("c++17");
        build.flag_if_supported("/EHsc");
        build.flag_if_supported("/bigobj");
    }

    #[cfg(not(target_os = "windows"))]
    {
        build.std("c++17");
        build.flag("-Wno-sign-compare");
    }

    build.file(&shim_src);
    for src in &decompiler_sources {
        build.file(src);
    }

    build.compile("dxbc_shim");

    println!("cargo:rustc-link-lib=static=dxbc_shim");
    println!("cargo:rustc-link-lib=d3dcompiler");
}
