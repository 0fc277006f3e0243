//! WGSL kernel sources for the folding layers.
//!
//! Shaders are generated per workgroup size because WGSL bakes the
//! workgroup dimensions into the source; the block size is a pure
//! performance knob and never changes results. Each kernel maps one work
//! item to one output cell of a 2D grid (`gid.x` = output row, `gid.y` =
//! column) and guards against the grid overshooting the output extent.

/// Sum folding forward kernel.
///
/// `out[r, c] = X[r, c] + X[r + N/2, c]` for `r < N/2`, `c < M`.
///
/// # Bindings
///
/// - Binding 0: dims (uniform) — [`FoldUniforms`](super::FoldUniforms)
/// - Binding 1: input (storage, read) — (N, M)
/// - Binding 2: output (storage, read_write) — (N/2, M)
pub fn generate_sum_fold_fprop(block_x: u32, block_y: u32) -> String {
    format!(
        r#"
struct Uniforms {{
    rows: u32,
    cols: u32,
    half_rows: u32,
    _pad: u32,
}}

@group(0) @binding(0) var<uniform> dims: Uniforms;
@group(0) @binding(1) var<storage, read> input: array<f32>;
@group(0) @binding(2) var<storage, read_write> output: array<f32>;

@compute @workgroup_size({block_x}, {block_y}, 1)
fn sum_fold_fprop(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let r = gid.x;
    let c = gid.y;

    if (r < dims.half_rows && c < dims.cols) {{
        output[r * dims.cols + c] =
            input[r * dims.cols + c] + input[(r + dims.half_rows) * dims.cols + c];
    }}
}}
"#
    )
}

/// Sum folding backward kernel.
///
/// Both contributing rows receive the upstream gradient unchanged.
///
/// # Bindings
///
/// - Binding 0: dims (uniform)
/// - Binding 1: delta (storage, read) — (N/2, M)
/// - Binding 2: grad (storage, read_write) — (N, M)
pub fn generate_sum_fold_bprop(block_x: u32, block_y: u32) -> String {
    format!(
        r#"
struct Uniforms {{
    rows: u32,
    cols: u32,
    half_rows: u32,
    _pad: u32,
}}

@group(0) @binding(0) var<uniform> dims: Uniforms;
@group(0) @binding(1) var<storage, read> delta: array<f32>;
@group(0) @binding(2) var<storage, read_write> grad: array<f32>;

@compute @workgroup_size({block_x}, {block_y}, 1)
fn sum_fold_bprop(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let r = gid.x;
    let c = gid.y;

    if (r < dims.half_rows && c < dims.cols) {{
        let d = delta[r * dims.cols + c];
        grad[r * dims.cols + c] = d;
        grad[(r + dims.half_rows) * dims.cols + c] = d;
    }}
}}
"#
    )
}

/// Max folding forward kernel.
///
/// Takes the element-wise maximum of the paired rows and records the
/// switch buffer. Ties (`v1 == v2`) mark the lower half selected; the
/// asymmetry is deliberate and matches the host reference exactly.
///
/// # Bindings
///
/// - Binding 0: dims (uniform)
/// - Binding 1: input (storage, read) — (N, M)
/// - Binding 2: output (storage, read_write) — (N/2, M)
/// - Binding 3: switches (storage, read_write) — (N, M)
pub fn generate_max_fold_fprop(block_x: u32, block_y: u32) -> String {
    format!(
        r#"
struct Uniforms {{
    rows: u32,
    cols: u32,
    half_rows: u32,
    _pad: u32,
}}

@group(0) @binding(0) var<uniform> dims: Uniforms;
@group(0) @binding(1) var<storage, read> input: array<f32>;
@group(0) @binding(2) var<storage, read_write> output: array<f32>;
@group(0) @binding(3) var<storage, read_write> switches: array<f32>;

@compute @workgroup_size({block_x}, {block_y}, 1)
fn max_fold_fprop(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let r = gid.x;
    let c = gid.y;

    if (r < dims.half_rows && c < dims.cols) {{
        let v1 = input[r * dims.cols + c];
        let v2 = input[(r + dims.half_rows) * dims.cols + c];

        output[r * dims.cols + c] = max(v1, v2);
        switches[r * dims.cols + c] = f32(v1 > v2);
        switches[(r + dims.half_rows) * dims.cols + c] = f32(v1 <= v2);
    }}
}}
"#
    )
}

/// Max folding backward kernel.
///
/// Routes the full upstream gradient to the switch-marked row and zero to
/// the other, per cell independently.
///
/// # Bindings
///
/// - Binding 0: dims (uniform)
/// - Binding 1: delta (storage, read) — (N/2, M)
/// - Binding 2: switches (storage, read) — (N, M)
/// - Binding 3: grad (storage, read_write) — (N, M)
pub fn generate_max_fold_bprop(block_x: u32, block_y: u32) -> String {
    format!(
        r#"
struct Uniforms {{
    rows: u32,
    cols: u32,
    half_rows: u32,
    _pad: u32,
}}

@group(0) @binding(0) var<uniform> dims: Uniforms;
@group(0) @binding(1) var<storage, read> delta: array<f32>;
@group(0) @binding(2) var<storage, read> switches: array<f32>;
@group(0) @binding(3) var<storage, read_write> grad: array<f32>;

@compute @workgroup_size({block_x}, {block_y}, 1)
fn max_fold_bprop(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let r = gid.x;
    let c = gid.y;

    if (r < dims.half_rows && c < dims.cols) {{
        let d = delta[r * dims.cols + c];
        grad[r * dims.cols + c] = switches[r * dims.cols + c] * d;
        grad[(r + dims.half_rows) * dims.cols + c] =
            switches[(r + dims.half_rows) * dims.cols + c] * d;
    }}
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_points() {
        assert!(generate_sum_fold_fprop(16, 16).contains("fn sum_fold_fprop"));
        assert!(generate_sum_fold_bprop(16, 16).contains("fn sum_fold_bprop"));
        assert!(generate_max_fold_fprop(16, 16).contains("fn max_fold_fprop"));
        assert!(generate_max_fold_bprop(16, 16).contains("fn max_fold_bprop"));
    }

    #[test]
    fn test_workgroup_size_baked_in() {
        let src = generate_sum_fold_fprop(8, 4);
        assert!(src.contains("@workgroup_size(8, 4, 1)"));
    }

    #[test]
    fn test_tie_break_is_lower_half() {
        // The strict comparison must be on the upper half only.
        let src = generate_max_fold_fprop(16, 16);
        assert!(src.contains("f32(v1 > v2)"));
        assert!(src.contains("f32(v1 <= v2)"));
    }
}
