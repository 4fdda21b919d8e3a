fn main() {
    #[cfg(feature = "re-pcre2")]
    pcre2();
    #[cfg(feature = "re-re2")]
    re2();
    #[cfg(feature = "re-hyperscan")]
    hyperscan();
}

// PCRE2 and Hyperscan are declared by hand in src/engine, so all that is
// needed for them is telling cargo where the library lives.

#[cfg(feature = "re-pcre2")]
#[allow(deprecated)]
fn pcre2() {
    if let Err(err) = pkg_config::Config::new().find("libpcre2-8") {
        eprintln!("libpcre2-8 cannot be found by pkg-config: {err}");
        std::process::exit(1);
    }
}

#[cfg(feature = "re-hyperscan")]
#[allow(deprecated)]
fn hyperscan() {
    if let Err(err) = pkg_config::Config::new().find("libhs") {
        eprintln!("hyperscan cannot be found by pkg-config: {err}");
        std::process::exit(1);
    }
}

// RE2 only has a C++ API, so a C API for it is compiled from re2.cpp. The
// shim has to come before RE2 on the link line, so RE2's link flags are
// printed after compiling it.
#[cfg(feature = "re-re2")]
#[allow(deprecated)]
fn re2() {
    let mut config = pkg_config::Config::new();
    config.cargo_metadata(false);
    let lib = match config.find("re2") {
        Ok(lib) => lib,
        Err(err) => {
            eprintln!("re2 cannot be found by pkg-config: {err}");
            std::process::exit(1);
        }
    };
    println!("cargo:rerun-if-changed=src/engine/re2.cpp");
    println!("cargo:rerun-if-changed=build.rs");
    cc::Build::new()
        .cpp(true)
        .flag_if_supported("-std=c++17")
        .includes(&lib.include_paths)
        .file("src/engine/re2.cpp")
        .compile("cre2");
    for path in lib.link_paths.iter() {
        println!("cargo:rustc-link-search=native={}", path.display());
    }
    for name in lib.libs.iter() {
        println!("cargo:rustc-link-lib={name}");
    }
}
