fn main() {
    for (var, name) in [
        ("TARGET", "KVLINK_BUILD_TARGET"),
        ("PROFILE", "KVLINK_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={name}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
}
