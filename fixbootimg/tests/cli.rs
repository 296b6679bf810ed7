/*
 * SPDX-FileCopyrightText: 2024 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

use std::{
    ffi::OsStr,
    fs,
    path::Path,
    process::{Command, Output},
};

use fixbootimg::{
    cli::patch::{self, PatchCli},
    format::avb::{self, Footer},
    stream::ToWriter,
};
use tempfile::TempDir;

const PARTITION_SIZE: u64 = 16 * 1024;

fn patch_cli(dir: &Path) -> PatchCli {
    PatchCli {
        input: dir.join("boot.img"),
        output: dir.join("boot.fixed.img"),
        partition_size: PARTITION_SIZE,
    }
}

fn write_input(cli: &PatchCli, magic: &[u8]) {
    let mut data = magic.to_vec();
    data.resize(4096, 0x5a);
    fs::write(&cli.input, data).unwrap();
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut entries = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    entries.sort();
    entries
}

#[test]
fn writes_output() {
    let temp_dir = TempDir::new().unwrap();
    let cli = patch_cli(temp_dir.path());
    write_input(&cli, b"ANDROID!");

    patch::patch_main(&cli).unwrap();

    let data = fs::read(&cli.output).unwrap();
    assert_eq!(data.len() as u64, PARTITION_SIZE);
    assert_eq!(&data[4096..4107], b"SignerVer02");

    let footer = avb::find_footer(&data).unwrap().unwrap();
    assert_eq!(footer.original_image_size, 4096 + 512);

    // Input is never modified.
    assert_eq!(fs::read(&cli.input).unwrap().len(), 4096);
}

#[test]
fn refuses_existing_output() {
    let temp_dir = TempDir::new().unwrap();
    let cli = patch_cli(temp_dir.path());
    write_input(&cli, b"ANDROID!");
    fs::write(&cli.output, b"keep").unwrap();

    let err = patch::patch_main(&cli).unwrap_err();
    assert!(err.to_string().starts_with("File already exists"), "{err:#}");

    assert_eq!(fs::read(&cli.output).unwrap(), b"keep");
}

#[test]
fn missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let cli = patch_cli(temp_dir.path());

    let err = patch::patch_main(&cli).unwrap_err();
    assert!(err.to_string().starts_with("File not found"), "{err:#}");

    assert!(!cli.output.exists());
}

#[test]
fn failure_leaves_no_output() {
    let temp_dir = TempDir::new().unwrap();
    let cli = patch_cli(temp_dir.path());
    write_input(&cli, b"NOTBOOT!");

    let err = patch::patch_main(&cli).unwrap_err();
    assert!(format!("{err:#}").contains("Not an Android bootable image"), "{err:#}");

    assert_eq!(dir_entries(temp_dir.path()), ["boot.img"]);
}

#[test]
fn patched_output_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let cli = patch_cli(temp_dir.path());
    write_input(&cli, b"ANDROID!");

    patch::patch_main(&cli).unwrap();

    let again = PatchCli {
        input: cli.output.clone(),
        output: temp_dir.path().join("boot.fixed2.img"),
        partition_size: PARTITION_SIZE,
    };

    let err = patch::patch_main(&again).unwrap_err();
    assert!(format!("{err:#}").contains("SignerVer02 magic already present"), "{err:#}");

    assert!(!again.output.exists());
}

fn run(args: &[&OsStr]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fixbootimg"))
        .args(args)
        .output()
        .unwrap()
}

fn lines(data: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(data)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn binary_wrong_argument_count() {
    let temp_dir = TempDir::new().unwrap();
    let cli = patch_cli(temp_dir.path());
    write_input(&cli, b"ANDROID!");

    let output = run(&[]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = lines(&output.stderr);
    assert!(stderr[0].starts_with("Error: "), "{stderr:?}");
    assert!(stderr[0].contains("Usage: "), "{stderr:?}");

    let extra = temp_dir.path().join("extra.img");
    let output = run(&[
        cli.input.as_os_str(),
        cli.output.as_os_str(),
        extra.as_os_str(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = lines(&output.stderr);
    assert!(stderr[0].starts_with("Error: "), "{stderr:?}");

    assert_eq!(dir_entries(temp_dir.path()), ["boot.img"]);
}

#[test]
fn binary_success() {
    let temp_dir = TempDir::new().unwrap();
    let cli = patch_cli(temp_dir.path());
    write_input(&cli, b"ANDROID!");

    let partition_size = PARTITION_SIZE.to_string();
    let output = run(&[
        OsStr::new("--partition-size"),
        OsStr::new(&partition_size),
        cli.input.as_os_str(),
        cli.output.as_os_str(),
    ]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = lines(&output.stdout);
    assert_eq!(stdout[0], "Adding magic & AVB footer...");
    assert!(stdout.last().unwrap().starts_with("Success! "), "{stdout:?}");
    assert!(!lines(&output.stderr).iter().any(|l| l.starts_with("Error: ")));

    assert_eq!(fs::metadata(&cli.output).unwrap().len(), PARTITION_SIZE);
}

#[test]
fn binary_failure_keeps_version_warning() {
    let temp_dir = TempDir::new().unwrap();
    let cli = patch_cli(temp_dir.path());

    // Unsupported footer version and data where the signer block would go.
    let mut data = b"ANDROID!".to_vec();
    data.resize(3008, 0x5a);
    data.resize(3608, 0x07);
    data.resize(PARTITION_SIZE as usize - Footer::SIZE, 0);
    Footer {
        version_major: 2,
        version_minor: 5,
        ..Footer::new(3008)
    }
    .to_writer(&mut data)
    .unwrap();
    fs::write(&cli.input, data).unwrap();

    let partition_size = PARTITION_SIZE.to_string();
    let output = run(&[
        OsStr::new("--partition-size"),
        OsStr::new(&partition_size),
        cli.input.as_os_str(),
        cli.output.as_os_str(),
    ]);
    assert_eq!(output.status.code(), Some(1));

    let stdout = lines(&output.stdout);
    assert_eq!(
        stdout,
        [
            "Adding magic & modifying AVB footer...",
            "Warning: Unexpected AVB footer version: 2.5",
        ],
    );

    let stderr = lines(&output.stderr);
    assert!(
        stderr.iter().any(|l| l.starts_with("Error: ") && l.contains("Expected zeros")),
        "{stderr:?}",
    );

    assert!(!cli.output.exists());
}
