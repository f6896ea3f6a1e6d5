extern crate env_logger;
extern crate pastel;

use std::rc::Rc;

use pastel::backends::headless::Command;
use pastel::prelude::*;
use pastel::resource::ResourceKind;

const VS: &str = "uniform mat4 u_MVP; void main() {}";
const FS: &str = "void main() {}";

fn renderer() -> Renderer<HeadlessDevice> {
    renderer_with(HeadlessDevice::new())
}

fn renderer_with(device: HeadlessDevice) -> Renderer<HeadlessDevice> {
    let _ = env_logger::try_init();

    let mut renderer = Renderer::new(device, RendererSettings::default()).unwrap();
    renderer.device_mut().take_commands();
    renderer
}

fn creates(commands: &[Command]) -> Vec<u64> {
    commands
        .iter()
        .filter_map(|v| match *v {
            Command::Create { serial, .. } => Some(serial),
            _ => None,
        })
        .collect()
}

fn states(commands: &[Command]) -> Vec<StateChange> {
    commands
        .iter()
        .filter_map(|v| match *v {
            Command::State(change) => Some(change),
            _ => None,
        })
        .collect()
}

fn activations(commands: &[Command]) -> Vec<(ResourceKind, ResourceId, bool, Option<u32>)> {
    commands
        .iter()
        .filter_map(|v| match *v {
            Command::Enable { kind, id, slot, .. } => Some((kind, id, true, slot)),
            Command::Disable { kind, id, slot, .. } => Some((kind, id, false, slot)),
            _ => None,
        })
        .collect()
}

/// Splits the commands of a draw at each submission.
fn per_pass(commands: &[Command]) -> Vec<&[Command]> {
    let mut passes = Vec::new();
    let mut start = 0;
    for (i, v) in commands.iter().enumerate() {
        if v.is_draw() {
            passes.push(&commands[start..i]);
            start = i + 1;
        }
    }

    passes
}

fn triangle(effect: Effect) -> (Visual, Rc<VertexBuffer>) {
    let format = VertexFormat::build()
        .with("Position", VertexAttributeType::FloatVec3, false, 0)
        .finish()
        .unwrap();

    let vb = Rc::new(VertexBuffer::new(3, 12, BufferUsage::Static, StorageMode::Host).unwrap());

    let mut visual = Visual::new(PrimitiveType::Triangles);
    visual.set_vertex_format(Rc::new(format));
    visual
        .vertex_group_mut()
        .set_vertex_buffer(0, vb.clone(), 0, 12)
        .unwrap();
    visual.add_effect(Rc::new(effect));
    (visual, vb)
}

#[test]
fn bind_is_idempotent() {
    let mut renderer = renderer();
    let vb = VertexBuffer::new(4, 16, BufferUsage::Dynamic, StorageMode::Host).unwrap();

    assert!(!renderer.is_bound(&vb));
    renderer.bind(&vb).unwrap();
    renderer.bind(&vb).unwrap();
    renderer.bind_buffer(&vb).unwrap();
    assert!(renderer.is_bound(&vb));

    let commands = renderer.device_mut().take_commands();
    assert_eq!(creates(&commands).len(), 1);
    assert_eq!(renderer.device().alive(), 1);

    renderer.unbind(&vb).unwrap();
    renderer.unbind(&vb).unwrap();
    assert!(!renderer.is_bound(&vb));
    assert_eq!(renderer.device().alive(), 0);
}

#[test]
fn rebind_creates_new_object() {
    let mut renderer = renderer();
    let texture = Texture2D::new(2, 2, TextureParams::default()).unwrap();

    renderer.bind_texture(&texture).unwrap();
    renderer.unbind_texture(&texture).unwrap();
    renderer.bind_texture(&texture).unwrap();

    let serials = creates(renderer.device().commands());
    assert_eq!(serials.len(), 2);
    assert_ne!(serials[0], serials[1]);
}

#[test]
fn untyped_buffer() {
    let mut renderer = renderer();
    let buffer = Buffer::new(8, 4, BufferUsage::Static, StorageMode::Host).unwrap();

    match renderer.bind_buffer(BufferRef::Untyped(&buffer)) {
        Err(Error::InvalidBufferType(id)) => assert_eq!(id, buffer.id()),
        other => panic!("unexpected {:?}", other),
    }

    assert!(renderer.device().commands().is_empty());
}

#[test]
fn live_region() {
    let vb = VertexBuffer::new(1024, 32, BufferUsage::Dynamic, StorageMode::Host).unwrap();
    assert_eq!(vb.capacity_bytes(), 32768);
    assert_eq!(vb.live_size_bytes(), 32768);

    vb.set_element_count(500).unwrap();
    assert_eq!(vb.live_size_bytes(), 16000);
    assert_eq!(vb.capacity_bytes(), 32768);
    assert!(vb.set_element_count(1025).is_err());
}

#[test]
fn update_buffer() {
    let mut renderer = renderer();
    let vb = VertexBuffer::new(8, 4, BufferUsage::Dynamic, StorageMode::Host).unwrap();
    vb.set_element_count(2).unwrap();
    vb.set_data_offset(4).unwrap();
    vb.write(4, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    renderer
        .update_buffer(&vb, AccessMode::Write, FlushMode::Explicit, SyncMode::Synchronized)
        .unwrap();

    let commands = renderer.device_mut().take_commands();
    let map = commands.iter().position(|v| match *v {
        Command::Map { params, .. } => params.offset == 4 && params.size == 8,
        _ => false,
    });

    let flush = commands.iter().position(|v| match *v {
        Command::Flush { offset, size, .. } => offset == 0 && size == 8,
        _ => false,
    });

    let unmap = commands.iter().position(|v| match *v {
        Command::Unmap { .. } => true,
        _ => false,
    });

    assert!(map.unwrap() < flush.unwrap());
    assert!(flush.unwrap() < unmap.unwrap());

    let params = MapParams {
        access: AccessMode::Read,
        flush: FlushMode::Automatic,
        sync: SyncMode::Synchronized,
        offset: 4,
        size: 8,
    };

    assert_eq!(renderer.map(&vb, params).unwrap().to_vec(), vec![1u8, 2, 3, 4, 5, 6, 7, 8]);
    renderer.unmap(&vb).unwrap();
}

#[test]
fn device_storage_refuses_update() {
    let mut renderer = renderer();
    let vb = VertexBuffer::new(8, 4, BufferUsage::Dynamic, StorageMode::Device).unwrap();

    match renderer.update_buffer(&vb, AccessMode::Write, FlushMode::Automatic, SyncMode::Synchronized) {
        Err(Error::InvalidState(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn map_contract() {
    let mut renderer = renderer();
    let ib = IndexBuffer::new(4, IndexFormat::U16, BufferUsage::Dynamic, StorageMode::Device).unwrap();

    match renderer.flush_buffer(&ib, 0, 2) {
        Err(Error::NotMapped(..)) => {}
        other => panic!("unexpected {:?}", other),
    }

    match renderer.unmap_buffer(&ib) {
        Err(Error::NotMapped(..)) => {}
        other => panic!("unexpected {:?}", other),
    }

    let params = MapParams {
        access: AccessMode::ReadWrite,
        flush: FlushMode::Explicit,
        sync: SyncMode::Synchronized,
        offset: 0,
        size: 8,
    };

    renderer
        .map_buffer(&ib, params)
        .unwrap()
        .copy_from_slice(&[9; 8]);

    match renderer.map_buffer(&ib, params) {
        Err(Error::AlreadyMapped(..)) => {}
        other => panic!("unexpected {:?}", other),
    }

    renderer.flush_buffer(&ib, 2, 4).unwrap();
    match renderer.flush_buffer(&ib, 6, 4) {
        Err(Error::Range { .. }) => {}
        other => panic!("unexpected {:?}", other),
    }

    renderer.unmap_buffer(&ib).unwrap();

    assert_eq!(renderer.map_buffer(&ib, params).unwrap().to_vec(), vec![9u8; 8]);
    renderer.unmap_buffer(&ib).unwrap();

    let params = MapParams { size: 9, ..params };
    match renderer.map_buffer(&ib, params) {
        Err(Error::Range { .. }) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn update_texture() {
    let mut renderer = renderer();
    let texture = Texture2D::new(2, 2, TextureParams::default()).unwrap();
    texture.write(0, &[255; 16]).unwrap();

    renderer
        .update_texture(&texture, FlushMode::Automatic, SyncMode::Synchronized)
        .unwrap();

    let commands = renderer.device().commands();
    assert_eq!(creates(commands).len(), 1);
    assert!(commands.iter().any(|v| match *v {
        Command::Map { params, .. } => params.size == 16,
        _ => false,
    }));

    assert!(!commands.iter().any(|v| match *v {
        Command::Flush { .. } => true,
        _ => false,
    }));
}

#[test]
fn unsupported_kinds() {
    let capabilities = Capabilities {
        texture_3d: false,
        ..Capabilities::default()
    };

    let mut renderer = renderer_with(HeadlessDevice::with_capabilities(capabilities));

    let volume = Texture3D::new(2, 2, 2, TextureParams::default()).unwrap();
    match renderer.bind_texture(&volume) {
        Err(Error::UnsupportedKind(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    let cube = TextureCube::new(2, TextureParams::default()).unwrap();
    match renderer.enable_texture(&cube, TextureUnit(0)) {
        Err(Error::UnsupportedKind(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert!(renderer.device().commands().is_empty());
}

#[test]
fn minimal_state_changes() {
    let mut blend = BlendState::default();
    blend.enabled = true;

    let mut blended = Pass::new(Rc::new(Shader::new(VS, FS).unwrap()));
    blended.states_mut().blend = Some(Rc::new(blend));

    let opaque = Pass::new(blended.shader().clone());
    let (visual, _) = triangle(Effect::new().with_pass(blended).with_pass(opaque));

    let mut renderer = renderer();
    renderer.draw(None, &visual).unwrap();

    let commands = renderer.device_mut().take_commands();
    assert_eq!(
        states(&commands),
        vec![
            StateChange::BlendEnabled(true),
            StateChange::BlendEnabled(false),
        ]
    );

    renderer.draw(None, &visual).unwrap();
    let commands = renderer.device_mut().take_commands();
    assert_eq!(states(&commands).len(), 2);

    renderer.reset_context().unwrap();
    assert!(states(renderer.device().commands()).len() > 2);
}

#[test]
fn passes_in_order() {
    let first = Rc::new(Shader::new(VS, FS).unwrap());
    let second = Rc::new(Shader::new(VS, FS).unwrap());
    let effect = Effect::new()
        .with_pass(Pass::new(first.clone()))
        .with_pass(Pass::new(second.clone()));

    let ib = IndexBuffer::new(6, IndexFormat::U16, BufferUsage::Static, StorageMode::Host).unwrap();
    let (mut visual, _) = triangle(effect);
    visual.set_index_buffer(Some(Rc::new(ib)));

    let mut renderer = renderer();
    let stats = renderer.draw(None, &visual).unwrap();
    assert_eq!(stats.passes, 2);
    assert_eq!(stats.submissions, 2);

    let commands = renderer.device().commands();
    let enable = |id: ResourceId| {
        commands
            .iter()
            .position(|v| match *v {
                Command::Enable { id: v, .. } => v == id,
                _ => false,
            })
            .unwrap()
    };

    let draws: Vec<_> = commands
        .iter()
        .enumerate()
        .filter_map(|(i, v)| match *v {
            Command::Draw(call) => Some((i, call)),
            _ => None,
        })
        .collect();

    assert_eq!(draws.len(), 2);
    assert!(enable(first.id()) < draws[0].0);
    assert!(draws[0].0 < enable(second.id()));
    assert!(enable(second.id()) < draws[1].0);

    for &(_, call) in &draws {
        let index = call.index.unwrap();
        assert_eq!(index.count, 6);
        assert_eq!(index.format, IndexFormat::U16);
        assert_eq!(call.instances, 1);
    }
}

#[test]
fn direct_enable_invalidates_slot() {
    let shader = Rc::new(Shader::new(VS, FS).unwrap());
    let (visual, vb) = triangle(Effect::new().with_pass(Pass::new(shader)));

    let mut renderer = renderer();
    renderer.draw(None, &visual).unwrap();
    renderer.device_mut().take_commands();

    let binding = VertexBinding {
        index: 0,
        offset: 0,
        stride: 12,
    };

    renderer.enable(&*vb, binding).unwrap();
    renderer.draw(None, &visual).unwrap();

    let enables = renderer
        .device()
        .commands()
        .iter()
        .filter(|v| match **v {
            Command::Enable { id, .. } => id == vb.id(),
            _ => false,
        })
        .count();

    assert_eq!(enables, 2);
}

#[test]
fn window_and_viewport() {
    let mut renderer = renderer();
    let window = renderer.window().unwrap();
    assert_eq!((window.width, window.height), (640, 320));

    renderer.set_viewport(10, 20, 100, 50).unwrap();
    assert_eq!(renderer.viewport().unwrap().width, 100);

    match renderer.set_window(0, 480, 0.0, 1.0) {
        Err(Error::InvalidSize(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    renderer.set_window(800, 600, 0.0, 1.0).unwrap();
    let vp = renderer.viewport().unwrap();
    assert_eq!((vp.x, vp.y, vp.width, vp.height), (0, 0, 800, 600));

    renderer.clear_frame_buffer(Color::black(), 1.0, 0).unwrap();
    renderer.swap_frame_buffer().unwrap();

    let commands = renderer.device().commands();
    assert_eq!(commands.last(), Some(&Command::Swap));
}

#[test]
fn settings() {
    let settings = RendererSettings::from_json(
        r#"{ "window": { "width": 1024, "height": 768 }, "max_texture_units": 4 }"#,
    )
    .unwrap();

    let renderer = Renderer::new(HeadlessDevice::new(), settings).unwrap();
    let window = renderer.window().unwrap();
    assert_eq!((window.width, window.height), (1024, 768));
    assert_eq!(renderer.slots().textures.len(), 4);

    let invalid = RendererSettings::from_json(r#"{ "window": { "near": 1.0, "far": 0.5 } }"#);
    match invalid {
        Err(Error::InvalidState(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn unbind_destroys_objects() {
    let vb = VertexBuffer::new(4, 4, BufferUsage::Static, StorageMode::Host).unwrap();
    let sampler = Sampler::new(SamplerParams::default());

    let mut renderer = renderer();
    renderer.bind(&vb).unwrap();
    renderer.bind(&sampler).unwrap();
    assert_eq!(renderer.device().alive(), 2);

    renderer.unbind(&sampler).unwrap();
    assert_eq!(renderer.device().alive(), 1);
}

#[test]
fn texture_units_tracked_independently() {
    let shader = Rc::new(Shader::new(VS, FS).unwrap());
    let a = Rc::new(Texture2D::new(2, 2, TextureParams::default()).unwrap());
    let b = Rc::new(Texture2D::new(2, 2, TextureParams::default()).unwrap());
    let sampler = Rc::new(Sampler::new(SamplerParams::default()));

    let mut first = Pass::new(shader.clone());
    first.set_texture(TextureUnit(0), a.clone());
    first.set_texture(TextureUnit(1), b.clone());
    first.set_sampler(TextureUnit(0), sampler.clone());

    let mut second = Pass::new(shader.clone());
    second.set_texture(TextureUnit(0), b.clone());
    second.set_texture(TextureUnit(1), b.clone());
    second.set_sampler(TextureUnit(0), sampler.clone());

    let (visual, _) = triangle(Effect::new().with_pass(first).with_pass(second));

    let mut renderer = renderer();
    assert_eq!(renderer.draw(None, &visual).unwrap().submissions, 2);

    let commands = renderer.device_mut().take_commands();
    let passes = per_pass(&commands);
    assert_eq!(passes.len(), 2);

    let first = activations(passes[0]);
    assert!(first.contains(&(ResourceKind::Texture2D, a.id(), true, Some(0))));
    assert!(first.contains(&(ResourceKind::Texture2D, b.id(), true, Some(1))));
    assert!(first.contains(&(ResourceKind::Sampler, sampler.id(), true, Some(0))));

    assert_eq!(
        activations(passes[1]),
        vec![
            (ResourceKind::Texture2D, a.id(), false, Some(0)),
            (ResourceKind::Texture2D, b.id(), true, Some(0)),
        ]
    );
}

#[test]
fn shader_buffer_slot() {
    let shader = Rc::new(Shader::new(VS, FS).unwrap());
    let x = Rc::new(ShaderBuffer::new(2, 16, 0, BufferUsage::Dynamic, StorageMode::Device).unwrap());
    let y = Rc::new(ShaderBuffer::new(2, 16, 0, BufferUsage::Dynamic, StorageMode::Device).unwrap());

    let mut first = Pass::new(shader.clone());
    first.set_shader_buffer(Some(x.clone()));

    let mut second = Pass::new(shader.clone());
    second.set_shader_buffer(Some(x.clone()));

    let mut third = Pass::new(shader.clone());
    third.set_shader_buffer(Some(y.clone()));

    let effect = Effect::new()
        .with_pass(first)
        .with_pass(second)
        .with_pass(third)
        .with_pass(Pass::new(shader.clone()));

    let (visual, _) = triangle(effect);

    let mut renderer = renderer();
    renderer.draw(None, &visual).unwrap();

    let commands = renderer.device_mut().take_commands();
    let passes = per_pass(&commands);
    assert_eq!(passes.len(), 4);

    let buffers = |commands: &[Command]| {
        activations(commands)
            .into_iter()
            .filter(|v| v.0 == ResourceKind::ShaderBuffer)
            .map(|v| (v.1, v.2))
            .collect::<Vec<_>>()
    };

    assert_eq!(buffers(passes[0]), vec![(x.id(), true)]);
    assert!(buffers(passes[1]).is_empty());
    assert_eq!(buffers(passes[2]), vec![(x.id(), false), (y.id(), true)]);
    assert!(buffers(passes[3]).is_empty());

    renderer.draw(None, &visual).unwrap();
    let commands = renderer.device_mut().take_commands();
    let passes = per_pass(&commands);
    assert_eq!(buffers(passes[0]), vec![(y.id(), false), (x.id(), true)]);
}

#[test]
fn clears_unmask_writes() {
    let mut masked = Pass::new(Rc::new(Shader::new(VS, FS).unwrap()));
    masked.states_mut().depth_test = Some(Rc::new(DepthTestState {
        write: false,
        ..DepthTestState::default()
    }));

    masked.states_mut().stencil = Some(Rc::new(StencilTestState {
        enabled: true,
        write_mask: 0xff,
        ..StencilTestState::default()
    }));

    let (visual, _) = triangle(Effect::new().with_pass(masked));

    let mut renderer = renderer();
    renderer.draw(None, &visual).unwrap();
    renderer.device_mut().take_commands();

    renderer.clear_depth_buffer(1.0).unwrap();
    assert_eq!(
        renderer.device_mut().take_commands(),
        vec![
            Command::State(StateChange::DepthWrite(true)),
            Command::Clear {
                color: None,
                depth: Some(1.0),
                stencil: None,
            },
        ]
    );

    renderer.clear_color_buffer(Color::black()).unwrap();
    assert!(states(&renderer.device_mut().take_commands()).is_empty());

    renderer.clear_frame_buffer(Color::black(), 1.0, 0).unwrap();
    let commands = renderer.device_mut().take_commands();
    assert_eq!(states(&commands), vec![StateChange::StencilWriteMask(!0)]);

    renderer.draw(None, &visual).unwrap();
    let commands = renderer.device_mut().take_commands();
    let changes = states(&commands);
    assert!(changes.contains(&StateChange::DepthWrite(false)));
    assert!(changes.contains(&StateChange::StencilWriteMask(0xff)));
}
