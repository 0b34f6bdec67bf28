//! Per-cell formulas of the bundled erosion kernels
//!
//! Both the CPU and the GPU kernel compute exactly these functions; the WGSL
//! shader in `gpu.rs` is a line-by-line port.
//!
//! Model: rain dissolves a layer of `solubility * rain` from the ground into
//! the water, so the water always carries `solubility * water` of material.
//! Water flows towards lower water surfaces (height + water). Evaporated
//! water drops its share of material back onto the ground.

use crate::erosion::kernel::{CellState, KernelParams};

/// 4-neighbourhood offsets (dx, dy)
pub const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

#[inline]
pub fn cell_index(resolution: usize, x: usize, y: usize) -> usize {
    x * resolution + y
}

/// In-grid 4-neighbours of `(x, y)`. Edges do not wrap.
pub fn neighbors(resolution: usize, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
    NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
        let nx = x as i64 + dx as i64;
        let ny = y as i64 + dy as i64;
        if nx >= 0 && ny >= 0 && (nx as usize) < resolution && (ny as usize) < resolution {
            Some((nx as usize, ny as usize))
        } else {
            None
        }
    })
}

#[inline]
pub fn surface(cells: &[CellState], idx: usize) -> f32 {
    cells[idx].height + cells[idx].water
}

/// Water leaving one cell during the Erosion stage
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outflow {
    /// Total water sent to lower neighbours
    pub amount: f32,
    /// Sum of positive surface drops to the neighbours
    pub total_drop: f32,
    /// Water surface of the cell
    pub surface: f32,
}

/// Outflow is `min(water, total_drop / (lower_neighbours + 1))`: enough to
/// level the cell with the average of its lower neighbours, never more water
/// than the cell holds.
pub fn outflow(cells: &[CellState], resolution: usize, x: usize, y: usize) -> Outflow {
    let idx = cell_index(resolution, x, y);
    let a = surface(cells, idx);

    let mut total_drop = 0.0f32;
    let mut lower = 0.0f32;
    for (nx, ny) in neighbors(resolution, x, y) {
        let drop = a - surface(cells, cell_index(resolution, nx, ny));
        if drop > 0.0 {
            total_drop += drop;
            lower += 1.0;
        }
    }

    let amount = if total_drop > 0.0 {
        cells[idx].water.min(total_drop / (lower + 1.0))
    } else {
        0.0
    };

    Outflow { amount, total_drop, surface: a }
}

/// Water moving from `from` to its neighbour `to`, proportional to the drop.
pub fn transfer(cells: &[CellState], resolution: usize, from: (usize, usize), to: (usize, usize)) -> f32 {
    let flow = outflow(cells, resolution, from.0, from.1);
    if flow.amount <= 0.0 {
        return 0.0;
    }
    let drop = flow.surface - surface(cells, cell_index(resolution, to.0, to.1));
    if drop <= 0.0 {
        return 0.0;
    }
    flow.amount * drop / flow.total_drop
}

pub fn rain_cell(cell: CellState, params: &KernelParams) -> CellState {
    CellState {
        height: cell.height,
        water: cell.water + params.rain,
    }
}

/// New state of `(x, y)` gathered from the previous stage's buffer only.
pub fn erode_cell(cells: &[CellState], resolution: usize, x: usize, y: usize, params: &KernelParams) -> CellState {
    let cell = cells[cell_index(resolution, x, y)];
    let out = outflow(cells, resolution, x, y).amount;
    let inflow: f32 = neighbors(resolution, x, y)
        .map(|n| transfer(cells, resolution, n, (x, y)))
        .sum();

    CellState {
        height: cell.height - params.solubility * params.rain,
        water: (cell.water - out + inflow).max(0.0),
    }
}

pub fn evaporate_cell(cell: CellState, params: &KernelParams) -> CellState {
    let water = cell.water * (1.0 - params.evaporation);
    CellState {
        height: cell.height + params.solubility * (cell.water - water),
        water,
    }
}
