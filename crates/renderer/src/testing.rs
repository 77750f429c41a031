//! Test doubles for the backend and host seams.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::backend::{
    AttributeLocation, BufferId, GraphicsBackend, ProgramId, ShaderId, ShaderStage,
    UniformKind, UniformLocation, VertexLayout,
};
use crate::error::DrawError;
use crate::host::{FrameHost, FrameRequest, ResizeListener};

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` under a plain-text subscriber at `TRACE` and returns what it
/// logged.
pub fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .without_time()
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Shared, ordered log of teardown-relevant events across doubles.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<&'static str>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: &'static str) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CompileShader(ShaderStage, ShaderId),
    DeleteShader(ShaderId),
    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    CreateBuffer(BufferId, Vec<f32>),
    DeleteBuffer(BufferId),
    SetViewport(u32, u32),
    Clear([f32; 4]),
    UseProgram(ProgramId),
    BindAttribute {
        buffer: BufferId,
        location: AttributeLocation,
        layout: VertexLayout,
    },
    UniformF32(UniformLocation, f32),
    UniformVec2(UniformLocation, [f32; 2]),
    DrawTriangleStrip(u32),
    Destroy,
}

#[derive(Debug)]
struct LinkedSources {
    vertex: String,
    fragment: String,
}

/// Backend double that records every call and fakes compilation.
///
/// "Compilation" only checks brace balance; a handle resolves when its name
/// appears in the linked sources.
#[derive(Debug)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    next_id: u32,
    shaders: HashMap<ShaderId, (ShaderStage, String)>,
    programs: HashMap<ProgramId, LinkedSources>,
    buffers: HashSet<BufferId>,
    max_dimension: u32,
    link_failure: Option<String>,
    draw_failures: VecDeque<DrawError>,
    destroyed: bool,
    journal: Journal,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_journal(Journal::new())
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            calls: Vec::new(),
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashSet::new(),
            max_dimension: 8192,
            link_failure: None,
            draw_failures: VecDeque::new(),
            destroyed: false,
            journal,
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn fail_next_link(&mut self, log: &str) {
        self.link_failure = Some(log.to_string());
    }

    pub fn fail_next_draw(&mut self, error: DrawError) {
        self.draw_failures.push_back(error);
    }

    pub fn set_max_surface_dimension(&mut self, max: u32) {
        self.max_dimension = max;
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::DrawTriangleStrip(_)))
            .count()
    }

    pub fn uniform_f32_uploads(&self, location: UniformLocation) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::UniformF32(loc, value) if *loc == location => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn uniform_vec2_uploads(&self, location: UniformLocation) -> Vec<[f32; 2]> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::UniformVec2(loc, value) if *loc == location => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn next_raw(&mut self) -> u32 {
        let raw = self.next_id;
        self.next_id += 1;
        raw
    }
}

fn unbalanced_brace_line(source: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut last_open = 0;
    for (index, line) in source.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    last_open = index + 1;
                }
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Some(index + 1);
                    }
                }
                _ => {}
            }
        }
    }
    (depth != 0).then_some(last_open)
}

impl GraphicsBackend for RecordingBackend {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        if let Some(line) = unbalanced_brace_line(source) {
            return Err(format!("ERROR: 0:{line}: unmatched brace"));
        }
        let id = ShaderId::new(self.next_raw());
        self.shaders.insert(id, (stage, source.to_string()));
        self.calls.push(BackendCall::CompileShader(stage, id));
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
        self.calls.push(BackendCall::DeleteShader(shader));
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        if let Some(log) = self.link_failure.take() {
            return Err(log);
        }
        let (Some((_, vertex)), Some((_, fragment))) =
            (self.shaders.get(&vertex), self.shaders.get(&fragment))
        else {
            return Err("link: unknown shader object".to_string());
        };
        let sources = LinkedSources {
            vertex: vertex.clone(),
            fragment: fragment.clone(),
        };
        let id = ProgramId::new(self.next_raw());
        self.programs.insert(id, sources);
        self.calls.push(BackendCall::LinkProgram(id));
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.calls.push(BackendCall::DeleteProgram(program));
        self.journal.push("delete_program");
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        let sources = self.programs.get(&program)?;
        sources
            .vertex
            .contains(name)
            .then(|| AttributeLocation::new(0))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let sources = self.programs.get(&program)?;
        let combined = format!("{}\n{}", sources.vertex, sources.fragment);
        combined
            .find(name)
            .map(|offset| UniformLocation::new(offset as u32))
    }

    /// The type keyword in front of the first mention decides the kind, so
    /// `float iTime;` and `vec2 iResolution;` resolve as declared.
    fn uniform_kind(&self, program: ProgramId, location: UniformLocation) -> Option<UniformKind> {
        let sources = self.programs.get(&program)?;
        let combined = format!("{}\n{}", sources.vertex, sources.fragment);
        let prefix = combined.get(..location.raw() as usize)?.trim_end();
        Some(if prefix.ends_with("float") {
            UniformKind::Float
        } else if prefix.ends_with("vec2") {
            UniformKind::Vec2
        } else {
            UniformKind::Other
        })
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> BufferId {
        let id = BufferId::new(self.next_raw());
        self.buffers.insert(id);
        self.calls.push(BackendCall::CreateBuffer(id, data.to_vec()));
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.calls.push(BackendCall::DeleteBuffer(buffer));
        self.journal.push("delete_buffer");
    }

    fn max_surface_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(BackendCall::SetViewport(width, height));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(BackendCall::Clear(color));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn bind_vertex_attribute(
        &mut self,
        buffer: BufferId,
        location: AttributeLocation,
        layout: VertexLayout,
    ) {
        self.calls.push(BackendCall::BindAttribute {
            buffer,
            location,
            layout,
        });
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.calls.push(BackendCall::UniformF32(location, value));
    }

    fn set_uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.calls.push(BackendCall::UniformVec2(location, value));
    }

    fn draw_triangle_strip(&mut self, vertex_count: u32) -> Result<(), DrawError> {
        if let Some(error) = self.draw_failures.pop_front() {
            return Err(error);
        }
        self.calls.push(BackendCall::DrawTriangleStrip(vertex_count));
        Ok(())
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.calls.push(BackendCall::Destroy);
        self.journal.push("destroy_context");
    }
}

/// Host double whose frame callbacks are fired by hand.
#[derive(Debug)]
pub struct ManualHost {
    viewport: (u32, u32),
    next_id: u64,
    pending: VecDeque<FrameRequest>,
    total_requests: usize,
    cancelled: usize,
    listeners: HashSet<ResizeListener>,
    journal: Journal,
}

impl ManualHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_journal(width, height, Journal::new())
    }

    pub fn with_journal(width: u32, height: u32, journal: Journal) -> Self {
        Self {
            viewport: (width, height),
            next_id: 1,
            pending: VecDeque::new(),
            total_requests: 0,
            cancelled: 0,
            listeners: HashSet::new(),
            journal,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    /// Pops the oldest outstanding request, as if the host fired it.
    pub fn take_pending_frame(&mut self) -> Option<FrameRequest> {
        self.pending.pop_front()
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    pub fn total_requests(&self) -> usize {
        self.total_requests
    }

    pub fn cancelled_requests(&self) -> usize {
        self.cancelled
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl FrameHost for ManualHost {
    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_id);
        self.next_id += 1;
        self.total_requests += 1;
        self.pending.push_back(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let before = self.pending.len();
        self.pending.retain(|pending| *pending != request);
        if self.pending.len() != before {
            self.cancelled += 1;
            self.journal.push("cancel_frame");
        }
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.viewport
    }

    fn add_resize_listener(&mut self) -> ResizeListener {
        let listener = ResizeListener(self.next_id);
        self.next_id += 1;
        self.listeners.insert(listener);
        listener
    }

    fn remove_resize_listener(&mut self, listener: ResizeListener) {
        if self.listeners.remove(&listener) {
            self.journal.push("remove_resize_listener");
        }
    }
}
