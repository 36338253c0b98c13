// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate num;
extern crate num_cpus;
extern crate polybrot;
extern crate tracing_subscriber;

use clap::{App, Arg, ArgMatches};
use num::Complex;
use polybrot::{Curve, Palette, Request, Viewport, CURVES, PALETTES};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_name<T: FromStr<Err = String>>(s: &str) -> Result<(), String> {
    T::from_str(s).map(|_| ())
}

fn names<T: ToString>(all: &[T]) -> String {
    all.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ")
}

const OUTPUT: &str = "output";
const FUNCTION: &str = "function";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const PALETTE: &str = "palette";
const CURVE: &str = "curve";
const VERBOSE: &str = "verbose";

const MAX_THREADS: usize = 1024;

fn args<'a>() -> ArgMatches<'a> {
    let palette_help = format!("Color palette, one of: {}", names(&PALETTES));
    let curve_help = format!("Interpolation curve, one of: {}", names(&CURVES));

    App::new("polybrot")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Escape-time fractals for arbitrary polynomial maps in z and c")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file, always written as PNG"),
        )
        .arg(
            Arg::with_name(FUNCTION)
                .required(false)
                .long(FUNCTION)
                .short("f")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("z**2 + c")
                .help("Polynomial in z and c to iterate"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1000x800")
                .validator(|s| validate_pair::<u32>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-2,-1.25")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner of the complex plane"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1,1.25")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner of the complex plane"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_THREADS,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", MAX_THREADS),
                    )
                })
                .help("Number of threads to use in solver [default: number of CPUs]"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("40")
                .validator(|s| {
                    validate_range(
                        &s,
                        1u32,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Iteration limit per point"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .required(false)
                .long(PALETTE)
                .short("p")
                .takes_value(true)
                .default_value("Inferno")
                .validator(|s| validate_name::<Palette>(&s))
                .help(&palette_help),
        )
        .arg(
            Arg::with_name(CURVE)
                .required(false)
                .long(CURVE)
                .short("c")
                .takes_value(true)
                .default_value("Autolog")
                .validator(|s| validate_name::<Curve>(&s))
                .help(&curve_help),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .short("v")
                .multiple(true)
                .help("Log more; repeat for more still.  RUST_LOG overrides"),
        )
        .get_matches()
}

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn request(matches: &ArgMatches) -> Request {
    // Every value below has already been through a validator.
    let (width, height) =
        parse_pair(matches.value_of(SIZE).unwrap(), 'x').expect("Error parsing image dimensions");
    let leftlower = parse_complex(matches.value_of(LEFTLOWER).unwrap())
        .expect("Error parsing left lower point");
    let rightupper = parse_complex(matches.value_of(RIGHTUPPER).unwrap())
        .expect("Error parsing right upper point");
    let iterations = u32::from_str(matches.value_of(ITERATIONS).unwrap())
        .expect("Could not parse iteration count.");
    let threads = matches
        .value_of(THREADS)
        .map(|t| usize::from_str(t).expect("Could not parse thread count."))
        .unwrap_or_else(num_cpus::get);

    let mut request = Request::new(
        matches.value_of(FUNCTION).unwrap(),
        matches.value_of(OUTPUT).unwrap(),
    );
    request.viewport = Viewport::from_corners(leftlower, rightupper, width, height, iterations);
    request.threads = threads;
    request.palette = Palette::from_str(matches.value_of(PALETTE).unwrap())
        .expect("Could not parse palette");
    request.curve =
        Curve::from_str(matches.value_of(CURVE).unwrap()).expect("Could not parse curve");
    request
}

fn main() {
    let matches = args();
    init_logging(matches.occurrences_of(VERBOSE));

    match polybrot::generate(&request(&matches)) {
        Err(e) => {
            eprintln!("Render failure: {}", e);
            std::process::exit(1);
        }
        Ok(report) => {
            println!("took {:.4} seconds", report.elapsed.as_secs_f64());
        }
    }
}
