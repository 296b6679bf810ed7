#[cfg(not(windows))]
mod fuzz {
    use fixbootimg::patch::image::{self, PatchConfig};
    use honggfuzz::fuzz;

    pub fn main() {
        // Small enough that both the append and truncate paths are reachable.
        let config = PatchConfig {
            partition_size: 4096,
        };

        loop {
            fuzz!(|data: &[u8]| {
                let mut data = data.to_vec();
                if image::patch_image(&mut data, &config).is_ok() {
                    assert_eq!(data.len() as u64, config.partition_size);
                }
            });
        }
    }
}

fn main() {
    #[cfg(not(windows))]
    fuzz::main();
}
