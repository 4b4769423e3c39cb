use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds only compile the library and its tests
    let target = env::var("TARGET").unwrap_or_default();
    if !target.contains("avr") {
        return;
    }

    // Configure for ATmega128A
    println!("cargo:rustc-link-arg=-mmcu=atmega128a");

    println!("cargo:warning=Building for ATmega128A at 16MHz");
}
