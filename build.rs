use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RUSTC");

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".into());
    let query = |args: &[&str]| {
        Command::new(&rustc)
            .args(args)
            .output()
            .ok()
            .filter(|out| out.status.success())
            .and_then(|out| String::from_utf8(out.stdout).ok())
    };

    // `rustversion` built-in fact.
    let version = query(&["--version"])
        .and_then(|text| text.split_whitespace().nth(1).map(str::to_string))
        .unwrap_or_default();
    // `rustsysroot` built-in fact.
    let sysroot = query(&["--print", "sysroot"])
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    println!("cargo:rustc-env=HOSTFACTS_RUSTC_VERSION={version}");
    println!("cargo:rustc-env=HOSTFACTS_RUSTC_SYSROOT={sysroot}");
}
