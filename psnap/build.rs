fn main() {
    #[cfg(not(any(
        target_os = "linux",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly",
        target_os = "freebsd",
    )))]
    compile_error!(
        "Building psnap for an unsupported platform. Currently only linux, openbsd, netbsd, dragonfly and freebsd are supported"
    )
}
