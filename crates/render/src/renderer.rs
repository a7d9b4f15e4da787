use std::collections::BTreeMap;
use std::fmt::Write as _;

use glam::Mat4;
use voxelbox_terrain::VertexLayout;

/// Opaque handle to an uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

/// Opaque handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u64);

/// Errors reported by renderer backends.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("unknown mesh handle {0:?}")]
    UnknownMesh(MeshHandle),
    #[error("unknown shader program {0:?}")]
    UnknownProgram(ShaderHandle),
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Renderer-agnostic interface. All backends implement this trait.
///
/// The renderer owns every GPU-side resource. Callers hold handles and must
/// release meshes they no longer draw.
pub trait Renderer {
    /// Called once at the start of every frame, before any draw.
    fn begin_frame(&mut self) {}

    /// Compile (or fetch) the program used for meshes with `layout`.
    fn compile_program(&mut self, layout: VertexLayout) -> Result<ShaderHandle, RenderError>;

    /// Upload a mesh. Arrays must satisfy [`validate_mesh`].
    fn create_mesh(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
        layout: VertexLayout,
        shader: ShaderHandle,
    ) -> Result<MeshHandle, RenderError>;

    /// Free a mesh. Releasing an unknown handle is a no-op.
    fn release_mesh(&mut self, handle: MeshHandle);

    /// Draw a mesh with the given OpenGL-convention projection and model-view.
    fn draw(
        &mut self,
        handle: MeshHandle,
        projection: &Mat4,
        model_view: &Mat4,
    ) -> Result<(), RenderError>;
}

/// Check that flat vertex/index arrays form a well-formed triangle mesh.
pub fn validate_mesh(
    vertices: &[f32],
    indices: &[u32],
    layout: VertexLayout,
) -> Result<(), RenderError> {
    let stride = layout.floats_per_vertex();
    if vertices.len() % stride != 0 {
        return Err(RenderError::InvalidMesh(format!(
            "{} floats is not a multiple of the {layout:?} stride {stride}",
            vertices.len()
        )));
    }
    if indices.is_empty() {
        return Err(RenderError::InvalidMesh("mesh has no indices".into()));
    }
    if indices.len() % 3 != 0 {
        return Err(RenderError::InvalidMesh(format!(
            "{} indices do not form whole triangles",
            indices.len()
        )));
    }
    let vertex_count = vertices.len() / stride;
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(RenderError::InvalidMesh(format!(
            "index {bad} out of range for {vertex_count} vertices"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct HeadlessMesh {
    layout: VertexLayout,
    vertex_count: usize,
    index_count: usize,
}

/// One recorded draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub mesh: MeshHandle,
    pub projection: Mat4,
    pub model_view: Mat4,
}

/// In-memory renderer that records meshes and draw calls.
///
/// Useful for CLI output, logging, and testing the render interface.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    programs: BTreeMap<ShaderHandle, VertexLayout>,
    meshes: BTreeMap<MeshHandle, HeadlessMesh>,
    draws: Vec<DrawCall>,
    next_id: u64,
    frames: u64,
    uploads: u64,
    releases: u64,
    total_draws: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw calls recorded since the last `begin_frame`.
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Meshes currently alive.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn contains_mesh(&self, handle: MeshHandle) -> bool {
        self.meshes.contains_key(&handle)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Meshes created over the renderer's lifetime.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Meshes released over the renderer's lifetime.
    pub fn releases(&self) -> u64 {
        self.releases
    }

    /// Human-readable summary of renderer state.
    pub fn report(&self) -> String {
        let vertices: usize = self.meshes.values().map(|m| m.vertex_count).sum();
        let indices: usize = self.meshes.values().map(|m| m.index_count).sum();

        let mut out = String::new();
        let _ = writeln!(out, "=== Headless Renderer (frames={}) ===", self.frames);
        let _ = writeln!(out, "Programs: {}", self.programs.len());
        let _ = writeln!(
            out,
            "Meshes: {} live ({} uploaded, {} released)",
            self.meshes.len(),
            self.uploads,
            self.releases
        );
        let _ = writeln!(out, "Geometry: {vertices} vertices, {indices} indices");
        let _ = writeln!(
            out,
            "Draws: {} last frame, {} total",
            self.draws.len(),
            self.total_draws
        );
        for (handle, mesh) in &self.meshes {
            let _ = writeln!(
                out,
                "  [mesh {}] {:?} vertices={} indices={}",
                handle.0, mesh.layout, mesh.vertex_count, mesh.index_count
            );
        }
        out
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Renderer for HeadlessRenderer {
    fn begin_frame(&mut self) {
        self.frames += 1;
        self.draws.clear();
    }

    fn compile_program(&mut self, layout: VertexLayout) -> Result<ShaderHandle, RenderError> {
        if let Some((&handle, _)) = self.programs.iter().find(|(_, l)| **l == layout) {
            return Ok(handle);
        }
        let handle = ShaderHandle(self.next_id());
        self.programs.insert(handle, layout);
        Ok(handle)
    }

    fn create_mesh(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
        layout: VertexLayout,
        shader: ShaderHandle,
    ) -> Result<MeshHandle, RenderError> {
        let program_layout = *self
            .programs
            .get(&shader)
            .ok_or(RenderError::UnknownProgram(shader))?;
        if program_layout != layout {
            return Err(RenderError::InvalidMesh(format!(
                "{layout:?} mesh used with a {program_layout:?} program"
            )));
        }
        validate_mesh(vertices, indices, layout)?;

        let handle = MeshHandle(self.next_id());
        self.meshes.insert(
            handle,
            HeadlessMesh {
                layout,
                vertex_count: vertices.len() / layout.floats_per_vertex(),
                index_count: indices.len(),
            },
        );
        self.uploads += 1;
        Ok(handle)
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if self.meshes.remove(&handle).is_some() {
            self.releases += 1;
        }
    }

    fn draw(
        &mut self,
        handle: MeshHandle,
        projection: &Mat4,
        model_view: &Mat4,
    ) -> Result<(), RenderError> {
        if !self.meshes.contains_key(&handle) {
            return Err(RenderError::UnknownMesh(handle));
        }
        self.draws.push(DrawCall {
            mesh: handle,
            projection: *projection,
            model_view: *model_view,
        });
        self.total_draws += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    #[test]
    fn validate_accepts_well_formed_mesh() {
        assert!(validate_mesh(&TRIANGLE, &[0, 1, 2], VertexLayout::Position).is_ok());
    }

    #[test]
    fn validate_rejects_bad_stride_and_indices() {
        let cases: [(&[f32], &[u32], VertexLayout); 4] = [
            (&TRIANGLE, &[0, 1, 2], VertexLayout::PositionUv),
            (&TRIANGLE, &[0, 1], VertexLayout::Position),
            (&TRIANGLE, &[0, 1, 3], VertexLayout::Position),
            (&TRIANGLE, &[], VertexLayout::Position),
        ];
        for (vertices, indices, layout) in cases {
            assert!(matches!(
                validate_mesh(vertices, indices, layout),
                Err(RenderError::InvalidMesh(_))
            ));
        }
    }

    #[test]
    fn programs_are_shared_per_layout() {
        let mut renderer = HeadlessRenderer::new();
        let a = renderer.compile_program(VertexLayout::Position).unwrap();
        let b = renderer.compile_program(VertexLayout::Position).unwrap();
        let c = renderer.compile_program(VertexLayout::PositionUv).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn create_draw_release_cycle() {
        let mut renderer = HeadlessRenderer::new();
        let shader = renderer.compile_program(VertexLayout::Position).unwrap();
        let mesh = renderer
            .create_mesh(&TRIANGLE, &[0, 1, 2], VertexLayout::Position, shader)
            .unwrap();

        renderer.begin_frame();
        renderer.draw(mesh, &Mat4::IDENTITY, &Mat4::IDENTITY).unwrap();
        assert_eq!(renderer.draws().len(), 1);
        assert_eq!(renderer.draws()[0].mesh, mesh);

        renderer.release_mesh(mesh);
        assert!(!renderer.contains_mesh(mesh));
        assert_eq!(
            renderer.draw(mesh, &Mat4::IDENTITY, &Mat4::IDENTITY),
            Err(RenderError::UnknownMesh(mesh))
        );
        // Double release is harmless.
        renderer.release_mesh(mesh);
        assert_eq!(renderer.releases(), 1);
    }

    #[test]
    fn unknown_or_mismatched_program_is_rejected() {
        let mut renderer = HeadlessRenderer::new();
        let missing = ShaderHandle(42);
        assert_eq!(
            renderer.create_mesh(&TRIANGLE, &[0, 1, 2], VertexLayout::Position, missing),
            Err(RenderError::UnknownProgram(missing))
        );

        let textured = renderer.compile_program(VertexLayout::PositionUv).unwrap();
        assert!(matches!(
            renderer.create_mesh(&TRIANGLE, &[0, 1, 2], VertexLayout::Position, textured),
            Err(RenderError::InvalidMesh(_))
        ));
    }

    #[test]
    fn begin_frame_clears_draws_and_counts_frames() {
        let mut renderer = HeadlessRenderer::new();
        let shader = renderer.compile_program(VertexLayout::Position).unwrap();
        let mesh = renderer
            .create_mesh(&TRIANGLE, &[0, 1, 2], VertexLayout::Position, shader)
            .unwrap();
        renderer.begin_frame();
        renderer.draw(mesh, &Mat4::IDENTITY, &Mat4::IDENTITY).unwrap();
        renderer.begin_frame();
        assert!(renderer.draws().is_empty());
        assert_eq!(renderer.frames(), 2);

        let report = renderer.report();
        assert!(report.contains("frames=2"));
        assert!(report.contains("1 total"));
        assert!(report.contains("3 vertices"));
    }
}
