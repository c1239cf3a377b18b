//! WGSL compute kernels.
//!
//! The energy kernel evaluates the toroidal Gaussian field with the same
//! per-cell summation order as the CPU evaluators, so the fields are
//! bit-identical across back-ends. The extrema kernel performs one level
//! of the paired tree reduction; the host drives the level loop.

/// Toroidal Gaussian energy field: one work item per cell.
pub const ENERGY: &str = r#"
    struct Dims {
        width: u32,
        height: u32,
        filter_size: u32,
        cells: u32,
    }

    @group(0) @binding(0) var<storage, read> pattern: array<u32>;
    @group(0) @binding(1) var<storage, read> weights: array<f32>;
    @group(0) @binding(2) var<storage, read_write> energy: array<f32>;
    @group(0) @binding(3) var<uniform> dims: Dims;

    fn wrap(v: i32, m: i32) -> i32 {
        return ((v % m) + m) % m;
    }

    @compute @workgroup_size(256)
    fn energy_main(@builtin(global_invocation_id) id: vec3<u32>) {
        let i = id.x;
        if (i >= dims.cells) {
            return;
        }

        let x = i32(i % dims.width);
        let y = i32(i / dims.width);
        let size = i32(dims.filter_size);
        let half = size / 2;
        let w = i32(dims.width);
        let h = i32(dims.height);

        var sum = 0.0;
        for (var q = 0; q < size; q = q + 1) {
            let row_base = wrap(y + q - half, h) * w;
            let weight_row = q * size;
            for (var p = 0; p < size; p = p + 1) {
                let wx = wrap(x + p - half, w);
                if (pattern[u32(row_base + wx)] != 0u) {
                    sum = sum + weights[u32(weight_row + p)];
                }
            }
        }
        energy[i] = sum;
    }
"#;

/// One level of the paired min/max tree reduction.
///
/// Each invocation combines elements `2i` and `2i+1` of both input
/// buffers. The min path keeps the lowest-energy zero-polarity cell, the
/// max path the highest-energy one-polarity cell; ties prefer the smaller
/// linear index, matching the CPU reducer. A cell of the wrong polarity
/// acts as an identity element so it never wins a comparison.
pub const EXTREMA: &str = r#"
    struct Cell {
        value: f32,
        index: u32,
        polarity: u32,
        pad: u32,
    }

    struct State {
        len: u32,
        pad0: u32,
        pad1: u32,
        pad2: u32,
    }

    @group(0) @binding(0) var<storage, read> min_in: array<Cell>;
    @group(0) @binding(1) var<storage, read> max_in: array<Cell>;
    @group(0) @binding(2) var<storage, read_write> min_out: array<Cell>;
    @group(0) @binding(3) var<storage, read_write> max_out: array<Cell>;
    @group(0) @binding(4) var<uniform> state: State;

    fn min_combine(a: Cell, b: Cell) -> Cell {
        if (a.polarity != 0u) {
            return b;
        }
        if (b.polarity != 0u) {
            return a;
        }
        if (b.value < a.value || (b.value == a.value && b.index < a.index)) {
            return b;
        }
        return a;
    }

    fn max_combine(a: Cell, b: Cell) -> Cell {
        if (a.polarity != 1u) {
            return b;
        }
        if (b.polarity != 1u) {
            return a;
        }
        if (b.value > a.value || (b.value == a.value && b.index < a.index)) {
            return b;
        }
        return a;
    }

    @compute @workgroup_size(256)
    fn extrema_main(@builtin(global_invocation_id) id: vec3<u32>) {
        let i = id.x;
        let out_len = (state.len + 1u) / 2u;
        if (i >= out_len) {
            return;
        }

        let a = 2u * i;
        let b = a + 1u;

        if (b < state.len) {
            min_out[i] = min_combine(min_in[a], min_in[b]);
            max_out[i] = max_combine(max_in[a], max_in[b]);
        } else {
            min_out[i] = min_in[a];
            max_out[i] = max_in[a];
        }
    }
"#;
