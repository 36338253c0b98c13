// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate assert_cmd;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn polybrot() -> Command {
    Command::cargo_bin("polybrot").unwrap()
}

#[test]
fn writes_a_png_of_the_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    polybrot()
        .args(&["-o", path.to_str().unwrap(), "-s", "64x48", "-i", "30", "-t", "2"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^took \d+\.\d{4} seconds\n$").unwrap());
    let written = image::open(&path).unwrap().to_rgb();
    assert_eq!(written.dimensions(), (64, 48));
}

#[test]
fn accepts_loose_palette_and_curve_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    polybrot()
        .args(&[
            "-o",
            path.to_str().unwrap(),
            "-s",
            "20x10",
            "-f",
            "-z**3 + c",
            "-l",
            "-1.5,-1",
            "-r",
            "1.5,1",
            "-p",
            "greys-inverted",
            "-c",
            "log2",
        ])
        .assert()
        .success();
    assert!(path.exists());
}

#[test]
fn bad_expression_fails_with_a_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    polybrot()
        .args(&["-o", path.to_str().unwrap(), "-s", "20x10", "-f", "exp(z) + c"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid expression"));
    assert!(!path.exists());
}

#[test]
fn empty_image_fails_with_a_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    polybrot()
        .args(&["-o", path.to_str().unwrap(), "-s", "0x10"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid viewport"));
}

#[test]
fn malformed_arguments_are_rejected() {
    polybrot().assert().failure();
    for args in &[
        ["-o", "x.png", "-s", "64by48"],
        ["-o", "x.png", "-l", "-2;-1"],
        ["-o", "x.png", "-i", "zero"],
        ["-o", "x.png", "-t", "0"],
        ["-o", "x.png", "-p", "sepia"],
        ["-o", "x.png", "-c", "cubic"],
    ] {
        polybrot().args(args).assert().failure();
    }
}
