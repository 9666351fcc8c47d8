fn main() {
    // rust-embed picks the page up at compile time
    println!("cargo:rerun-if-changed=dashboard");
}
