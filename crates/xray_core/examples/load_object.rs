//! Example: Load and inspect an object descriptor.
//!
//! Run with: cargo run --example load_object -- demos/objects/kelvin_lattice.json

use std::env;

use xray_core::{load_object, DVec3};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: load_object <path-to-descriptor>");
        println!("\nExamples:");
        println!("  cargo run --example load_object -- demos/objects/sphere.json");
        println!("  cargo run --example load_object -- demos/objects/kelvin_lattice.json");
        return;
    }

    let path = &args[1];
    println!("Loading descriptor: {}", path);

    match load_object(path) {
        Ok(object) => {
            println!("\n=== {} ===", object);
            println!("Min feature size: {}", object.min_feature_size());

            match object.bounds() {
                Some(bounds) => {
                    let (lo, hi) = (bounds.min(), bounds.max());
                    println!(
                        "Bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
                        lo.x, lo.y, lo.z, hi.x, hi.y, hi.z
                    );
                    println!("Scan half-width: {:.3}", bounds.origin_radius());
                }
                None => println!("Bounds: unbounded"),
            }

            println!("\n--- Density along x ---");
            for i in 0..=10 {
                let x = -1.0 + 0.2 * i as f64;
                println!("  x = {:+.1}: {:.3}", x, object.density(DVec3::new(x, 0.0, 0.0)));
            }
        }
        Err(e) => {
            eprintln!("Error loading descriptor: {}", e);
            std::process::exit(1);
        }
    }
}
