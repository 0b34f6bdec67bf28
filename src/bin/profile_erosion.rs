//! Profiling tool: time noise synthesis against each erosion kernel

use std::time::{Duration, Instant};

use terrain_generator::erosion::{simulate, CpuKernel, ErosionKernel, ErosionParams, GpuKernel};
use terrain_generator::noise_field::{generate_noise_field, PerlinSampler};
use terrain_generator::{TerrainConfig, TerrainError};

fn main() -> Result<(), TerrainError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let resolution: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(513);
    let mut config = TerrainConfig::with_resolution(resolution);
    config.validate()?;

    println!("=== Performance Profiling ===");
    println!(
        "Grid: {}x{} ({} cells), {} octaves",
        resolution,
        resolution,
        config.cell_count(),
        config.noise.octaves()
    );
    println!();

    // Noise synthesis does not depend on the kernel
    config.erosion.enabled = false;
    let start = Instant::now();
    let noise = generate_noise_field(&config, &PerlinSampler::default(), None)?;
    let noise_time = start.elapsed();
    println!("Noise field:      {:?}", noise_time);

    let params = ErosionParams::default();
    println!("\nErosion parameters:");
    println!("  Iterations:  {}", params.iterations);
    println!("  Rain:        {}", params.rain);
    println!("  Solubility:  {}", params.solubility);
    println!("  Evaporation: {}", params.evaporation);
    println!();

    let mut kernels: Vec<Box<dyn ErosionKernel>> = vec![Box::new(CpuKernel::new())];
    match GpuKernel::new() {
        Some(gpu) => {
            println!("GPU adapter: {}", gpu.adapter_name());
            kernels.push(Box::new(gpu));
        }
        None => println!("GPU adapter: none, skipping GPU kernel"),
    }

    let mut timings: Vec<(String, Duration)> = Vec::new();
    for kernel in &kernels {
        let start = Instant::now();
        let (_, stats) = simulate(&noise.field, &params, kernel.as_ref())?;
        let elapsed = start.elapsed();
        println!("Erosion ({}): {:?}", kernel.name(), elapsed);
        println!("  Eroded:    {:.4}", stats.total_eroded);
        println!("  Deposited: {:.4}", stats.total_deposited);
        println!(
            "  Per iteration: {:?}",
            elapsed / stats.iterations.max(1) as u32
        );
        timings.push((kernel.name().to_string(), elapsed));
    }

    println!("\n=== Summary ===");
    for (name, erosion_time) in &timings {
        let total = noise_time + *erosion_time;
        println!(
            "{:<4} noise {:>6.2}%  erosion {:>6.2}%  total {:?}",
            name,
            100.0 * noise_time.as_secs_f64() / total.as_secs_f64(),
            100.0 * erosion_time.as_secs_f64() / total.as_secs_f64(),
            total
        );
    }

    Ok(())
}
