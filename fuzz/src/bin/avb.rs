#[cfg(not(windows))]
mod fuzz {
    use fixbootimg::format::avb;
    use honggfuzz::fuzz;

    pub fn main() {
        loop {
            fuzz!(|data: &[u8]| {
                let _ = avb::find_footer(data);
            });
        }
    }
}

fn main() {
    #[cfg(not(windows))]
    fuzz::main();
}
