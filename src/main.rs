use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sc2vox::canvas::{Material, MemoryCanvas};
use sc2vox::container::CityMap;
use sc2vox::export;
use sc2vox::structures::NoStructures;
use sc2vox::synth::Synthesizer;
use sc2vox::terrain::{HEIGHT, WIDTH};

#[derive(Parser, Debug)]
#[command(name = "sc2vox")]
#[command(about = "Decode a SimCity 2000 save and synthesize a voxel world")]
struct Args {
    /// Path to the .sc2 save file
    input: PathBuf,

    /// Directory for the exported preview images
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Random seed for vegetation placement
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Run the full voxel synthesis and report block counts
    #[arg(long)]
    synth: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("Loading {}...", args.input.display());
    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: cannot open {}: {}", args.input.display(), e);
            exit(1);
        }
    };

    let map = match CityMap::load(BufReader::new(file)) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {}", e);
            exit(1);
        }
    };

    println!("Container declares {} bytes", map.declared_size());

    // Segment table, sorted by tag for stable output
    let mut segments: Vec<_> = map.segments().collect();
    segments.sort_by_key(|s| s.tag().0);
    println!("Found {} segments:", segments.len());
    for segment in segments {
        if segment.is_compressed() {
            println!(
                "  {}  {} bytes ({} compressed)",
                segment.tag(),
                segment.data().len(),
                segment.raw_size()
            );
        } else {
            println!("  {}  {} bytes raw", segment.tag(), segment.raw_size());
        }
    }

    // Terrain statistics
    let terrain = map.terrain();
    let mut flat = 0usize;
    let mut sloped = 0usize;
    let mut canals = 0usize;
    let mut waterfalls = 0usize;
    let mut flooded = 0usize;
    let mut min_alt = i32::MAX;
    let mut max_alt = i32::MIN;
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if terrain.is_flat(x, y) {
                flat += 1;
            }
            if terrain.is_slope(x, y) {
                sloped += 1;
            }
            if terrain.is_canal(x, y) {
                canals += 1;
            }
            if terrain.is_waterfall(x, y) {
                waterfalls += 1;
            }
            if terrain.is_flooded(x, y) {
                flooded += 1;
            }
            let alt = terrain.get_terrain_altitude(x, y);
            min_alt = min_alt.min(alt);
            max_alt = max_alt.max(alt);
        }
    }
    let total = WIDTH * HEIGHT;
    println!(
        "Terrain: altitude {}..{}, {} flat, {} sloped, {} canal, {} waterfall ({:.1}% flooded)",
        min_alt,
        max_alt,
        flat,
        sloped,
        canals,
        waterfalls,
        100.0 * flooded as f64 / total as f64
    );

    // Preview exports
    let altitude_path = args.out_dir.join("altitude.png");
    let classes_path = args.out_dir.join("tile_classes.png");
    if let Err(e) = export::export_altitude_map(terrain, altitude_path.to_str().unwrap()) {
        eprintln!("error: failed to export altitude map: {}", e);
        exit(1);
    }
    println!("Exported {}", altitude_path.display());
    if let Err(e) = export::export_tile_classes(terrain, classes_path.to_str().unwrap()) {
        eprintln!("error: failed to export tile classes: {}", e);
        exit(1);
    }
    println!("Exported {}", classes_path.display());

    if args.synth {
        println!("Synthesizing voxel world with seed {}...", args.seed);
        let mut canvas = MemoryCanvas::new();
        let rng = ChaCha8Rng::seed_from_u64(args.seed);
        let structures = NoStructures;
        let mut synth = Synthesizer::new(terrain, &structures, &mut canvas, rng);
        synth.synthesize();

        println!(
            "Wrote {} blocks over {} columns",
            canvas.block_count(),
            canvas.biome_count()
        );
        println!(
            "  stone {}, dirt {}, sandstone {}, water {}, falling water {}, shrubs {}",
            canvas.count_of(Material::Stone),
            canvas.count_of(Material::Dirt),
            canvas.count_of(Material::Sandstone),
            canvas.count_of(Material::Water),
            canvas.count_of(Material::FallingWater),
            canvas.count_of(Material::Shrub),
        );
    }
}
