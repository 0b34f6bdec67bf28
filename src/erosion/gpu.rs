//! GPU erosion kernel using wgpu compute shaders
//!
//! One WGSL module holds the `rain`, `erode` and `evaporate` entry points.
//! Each stage binds the previous stage's cells as a read-only storage buffer
//! and writes a separate read-write buffer, mirroring the CPU kernel cell
//! for cell.

use std::borrow::Cow;

use wgpu::util::DeviceExt;

use crate::erosion::kernel::{CellState, ErosionKernel, KernelParams, Stage};
use crate::error::ErosionError;

const WORKGROUP_SIZE: u32 = 8;

/// GPU context and the three stage pipelines
pub struct GpuKernel {
    device: wgpu::Device,
    queue: wgpu::Queue,
    rain_pipeline: wgpu::ComputePipeline,
    erode_pipeline: wgpu::ComputePipeline,
    evaporate_pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    max_binding_size: u64,
    adapter_name: String,
}

impl GpuKernel {
    /// Create a new GPU kernel.
    /// Returns None if no adapter or device is available.
    pub fn new() -> Option<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Option<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_name = adapter.get_info().name;
        log::info!("GPU adapter: {}", adapter_name);

        // Large grids (4097²) need more than the default 128 MiB binding size.
        let adapter_limits = adapter.limits();
        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            max_buffer_size: adapter_limits.max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Erosion GPU"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .ok()?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Erosion Stage Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(EROSION_SHADER)),
        });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Erosion Bind Group Layout"),
            entries: &[
                // Previous stage's cells
                storage_entry(0, true),
                // This stage's cells
                storage_entry(1, false),
                // Parameters uniform buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Erosion Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let rain_pipeline = make_pipeline("rain");
        let erode_pipeline = make_pipeline("erode");
        let evaporate_pipeline = make_pipeline("evaporate");

        Some(Self {
            device,
            queue,
            rain_pipeline,
            erode_pipeline,
            evaporate_pipeline,
            bind_group_layout,
            max_binding_size: adapter_limits.max_storage_buffer_binding_size as u64,
            adapter_name,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn pipeline(&self, stage: Stage) -> &wgpu::ComputePipeline {
        match stage {
            Stage::Rain => &self.rain_pipeline,
            Stage::Erosion => &self.erode_pipeline,
            Stage::Evaporation => &self.evaporate_pipeline,
        }
    }

    /// Upload `input`, run one stage over the whole grid, read the result into `output`.
    fn dispatch(
        &self,
        stage: Stage,
        input: &[CellState],
        output: &mut [CellState],
        params: &KernelParams,
    ) -> Result<(), ErosionError> {
        let expected = params.cell_count();
        for actual in [input.len(), output.len()] {
            if actual != expected {
                return Err(ErosionError::BufferMismatch {
                    stage: stage.name(),
                    expected,
                    actual,
                });
            }
        }
        if expected == 0 {
            return Ok(());
        }

        let byte_size = (expected * std::mem::size_of::<CellState>()) as u64;
        if byte_size > self.max_binding_size {
            return Err(ErosionError::Gpu(format!(
                "{} bytes of cell state exceed the adapter's {} byte storage binding limit",
                byte_size, self.max_binding_size
            )));
        }

        let input_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Stage Input Buffer"),
            contents: bytemuck::cast_slice(input),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Stage Output Buffer"),
            size: byte_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let params_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Params Buffer"),
            contents: bytemuck::bytes_of(params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: byte_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Erosion Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Erosion Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(stage.name()),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(self.pipeline(stage));
            compute_pass.set_bind_group(0, &bind_group, &[]);

            let groups = params.resolution.div_ceil(WORKGROUP_SIZE);
            compute_pass.dispatch_workgroups(groups, groups, 1);
        }

        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, byte_size);
        self.queue.submit(std::iter::once(encoder.finish()));

        // Map and read the buffer
        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| ErosionError::Gpu(format!("{} readback channel closed: {}", stage, e)))?
            .map_err(|e| ErosionError::Gpu(format!("{} readback failed: {}", stage, e)))?;

        {
            let data = buffer_slice.get_mapped_range();
            output.copy_from_slice(bytemuck::cast_slice(&data));
        }
        staging_buffer.unmap();

        Ok(())
    }
}

impl ErosionKernel for GpuKernel {
    fn name(&self) -> &str {
        "gpu"
    }

    fn rain(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        self.dispatch(Stage::Rain, input, output, params)
    }

    fn erode(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        self.dispatch(Stage::Erosion, input, output, params)
    }

    fn evaporate(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        self.dispatch(Stage::Evaporation, input, output, params)
    }
}

/// WGSL port of `erosion::utils`
const EROSION_SHADER: &str = r#"
struct Cell {
    height: f32,
    water: f32,
}

struct Params {
    resolution: u32,
    rain: f32,
    solubility: f32,
    evaporation: f32,
}

@group(0) @binding(0) var<storage, read> in_cells: array<Cell>;
@group(0) @binding(1) var<storage, read_write> out_cells: array<Cell>;
@group(0) @binding(2) var<uniform> params: Params;

fn cell_index(x: i32, y: i32) -> u32 {
    return u32(x) * params.resolution + u32(y);
}

fn in_grid(x: i32, y: i32) -> bool {
    let r = i32(params.resolution);
    return x >= 0 && y >= 0 && x < r && y < r;
}

fn surface(x: i32, y: i32) -> f32 {
    let c = in_cells[cell_index(x, y)];
    return c.height + c.water;
}

fn neighbor_offset(k: u32) -> vec2<i32> {
    var offsets = array<vec2<i32>, 4>(
        vec2<i32>(-1, 0),
        vec2<i32>(1, 0),
        vec2<i32>(0, -1),
        vec2<i32>(0, 1),
    );
    return offsets[k];
}

// (amount, total_drop, surface)
fn outflow(x: i32, y: i32) -> vec3<f32> {
    let a = surface(x, y);
    var total_drop = 0.0;
    var lower = 0.0;
    for (var k = 0u; k < 4u; k++) {
        let n = vec2<i32>(x, y) + neighbor_offset(k);
        if (in_grid(n.x, n.y)) {
            let drop = a - surface(n.x, n.y);
            if (drop > 0.0) {
                total_drop += drop;
                lower += 1.0;
            }
        }
    }

    var amount = 0.0;
    if (total_drop > 0.0) {
        amount = min(in_cells[cell_index(x, y)].water, total_drop / (lower + 1.0));
    }
    return vec3<f32>(amount, total_drop, a);
}

fn transfer(src: vec2<i32>, dst: vec2<i32>) -> f32 {
    let flow = outflow(src.x, src.y);
    if (flow.x <= 0.0) {
        return 0.0;
    }
    let drop = flow.z - surface(dst.x, dst.y);
    if (drop <= 0.0) {
        return 0.0;
    }
    return flow.x * drop / flow.y;
}

@compute @workgroup_size(8, 8)
fn rain(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.resolution || id.y >= params.resolution) {
        return;
    }
    let idx = id.x * params.resolution + id.y;
    let c = in_cells[idx];
    out_cells[idx] = Cell(c.height, c.water + params.rain);
}

@compute @workgroup_size(8, 8)
fn erode(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.resolution || id.y >= params.resolution) {
        return;
    }
    let cell = vec2<i32>(i32(id.x), i32(id.y));
    let idx = cell_index(cell.x, cell.y);
    let c = in_cells[idx];
    let outgoing = outflow(cell.x, cell.y).x;

    var inflow = 0.0;
    for (var k = 0u; k < 4u; k++) {
        let n = cell + neighbor_offset(k);
        if (in_grid(n.x, n.y)) {
            inflow += transfer(n, cell);
        }
    }

    out_cells[idx] = Cell(
        c.height - params.solubility * params.rain,
        max(c.water - outgoing + inflow, 0.0),
    );
}

@compute @workgroup_size(8, 8)
fn evaporate(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.resolution || id.y >= params.resolution) {
        return;
    }
    let idx = id.x * params.resolution + id.y;
    let c = in_cells[idx];
    let water = c.water * (1.0 - params.evaporation);
    out_cells[idx] = Cell(c.height + params.solubility * (c.water - water), water);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erosion::cpu::CpuKernel;

    fn bumpy(resolution: usize) -> Vec<CellState> {
        (0..resolution * resolution)
            .map(|i| CellState {
                height: ((i * 37) % 17) as f32 / 17.0,
                water: ((i * 13) % 7) as f32 / 70.0,
            })
            .collect()
    }

    #[test]
    fn test_gpu_matches_cpu() {
        let Some(gpu) = GpuKernel::new() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let params = KernelParams {
            resolution: 33,
            rain: 0.01,
            solubility: 0.1,
            evaporation: 0.5,
        };
        let input = bumpy(33);

        for stage in Stage::ORDER {
            let mut cpu_out = vec![CellState::default(); input.len()];
            let mut gpu_out = vec![CellState::default(); input.len()];
            CpuKernel.run_stage(stage, &input, &mut cpu_out, &params).unwrap();
            gpu.run_stage(stage, &input, &mut gpu_out, &params).unwrap();

            for (c, g) in cpu_out.iter().zip(&gpu_out) {
                assert!((c.height - g.height).abs() < 1e-4, "{} height {} vs {}", stage, c.height, g.height);
                assert!((c.water - g.water).abs() < 1e-4, "{} water {} vs {}", stage, c.water, g.water);
            }
        }
    }
}
