use crate::animator::{Frame, RenderTarget};
use crate::camera::{CameraUniform, Viewport};
use crate::geometry::{glow_sprite, icosphere, wireframe_edges};
use crate::{FieldError, FieldParams, FieldResult, Particle, ShellParams};
use log::{debug, warn};
use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};
use winit::window::Window;

const SPRITE_SIZE: u32 = 64;
const PARTICLE_OPACITY: f32 = 0.8;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
  r: 0.008,
  g: 0.006,
  b: 0.016,
  a: 1.0,
};

/// Instance, adapter and device shared by every surface the app creates.
pub struct GpuContext {
  pub instance: wgpu::Instance,
  pub adapter: wgpu::Adapter,
  pub device: wgpu::Device,
  pub queue: wgpu::Queue,
}

impl GpuContext {
  pub async fn init() -> FieldResult<Self> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
      #[cfg(not(target_arch = "wasm32"))]
      backends: wgpu::Backends::PRIMARY,
      ..Default::default()
    });

    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
      })
      .await
      .ok_or(FieldError::NoAdapter)?;
    debug!("using adapter {:?}", adapter.get_info());

    let (device, queue) = adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: None,
          required_features: wgpu::Features::empty(),
          required_limits: wgpu::Limits::default(),
          memory_hints: Default::default(),
        },
        None,
      )
      .await?;

    Ok(Self {
      instance,
      adapter,
      device,
      queue,
    })
  }
}

/// Model matrix and colour for one drawn object.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
  model: [[f32; 4]; 4],
  tint: [f32; 4],
  /// x: sprite size per unit of particle size.
  extra: [f32; 4],
}

impl ObjectUniform {
  fn new(model: cgmath::Matrix4<f32>, color: [f32; 3], opacity: f32, sprite_scale: f32) -> Self {
    Self {
      model: model.into(),
      tint: [color[0], color[1], color[2], opacity],
      extra: [sprite_scale, 0.0, 0.0, 0.0],
    }
  }
}

struct ShellMesh {
  vertices: wgpu::Buffer,
  indices: wgpu::Buffer,
  index_count: u32,
  uniform: wgpu::Buffer,
  bind_group: wgpu::BindGroup,
  color: [f32; 3],
  opacity: f32,
}

/// Every GPU object owned by a mounted field.
struct Resources {
  surface: wgpu::Surface<'static>,
  config: wgpu::SurfaceConfiguration,
  camera_buffer: wgpu::Buffer,
  camera_bind_group: wgpu::BindGroup,
  cloud_uniform: wgpu::Buffer,
  cloud_bind_group: wgpu::BindGroup,
  sprite_texture: wgpu::Texture,
  sprite_bind_group: wgpu::BindGroup,
  particle_buffer: Option<wgpu::Buffer>,
  particle_capacity: usize,
  particle_pipeline: wgpu::RenderPipeline,
  shell_pipeline: wgpu::RenderPipeline,
  shells: [ShellMesh; 2],
}

pub struct FieldRenderer {
  gpu: Rc<GpuContext>,
  sprite_scale: f32,
  resources: Option<Resources>,
}

impl FieldRenderer {
  pub fn init(
    gpu: Rc<GpuContext>,
    window: Arc<Window>,
    viewport: Viewport,
    params: &FieldParams,
    shells: &[ShellParams; 2],
  ) -> FieldResult<Self> {
    let device = &gpu.device;
    let surface = gpu.instance.create_surface(window)?;
    let mut config = surface
      .get_default_config(&gpu.adapter, viewport.width.max(1), viewport.height.max(1))
      .ok_or(FieldError::UnsupportedSurface)?;
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    surface.configure(device, &config);

    let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("particles"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/particles.wgsl"))),
    });
    let shell_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("shell"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/shell.wgsl"))),
    });

    // ========================================================================
    // uniforms
    // ========================================================================

    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Camera Buffer"),
      contents: bytemuck::cast_slice(&[CameraUniform::new()]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let camera_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
      label: Some("camera_bind_group_layout"),
    });
    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &camera_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: camera_buffer.as_entire_binding(),
      }],
      label: Some("camera_bind_group"),
    });

    let object_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      entries: &[uniform_entry(
        0,
        wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
      )],
      label: Some("object_bind_group_layout"),
    });
    let object = |label: &str| {
      let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<ObjectUniform>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
      });
      let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &object_bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
          binding: 0,
          resource: buffer.as_entire_binding(),
        }],
        label: Some(label),
      });
      (buffer, bind_group)
    };
    let (cloud_uniform, cloud_bind_group) = object("cloud");

    // ========================================================================
    // particle sprite
    // ========================================================================

    let sprite_extent = wgpu::Extent3d {
      width: SPRITE_SIZE,
      height: SPRITE_SIZE,
      depth_or_array_layers: 1,
    };
    let sprite_texture = device.create_texture(&wgpu::TextureDescriptor {
      label: Some("Glow Sprite"),
      size: sprite_extent,
      mip_level_count: 1,
      sample_count: 1,
      dimension: wgpu::TextureDimension::D2,
      format: wgpu::TextureFormat::Rgba8Unorm,
      usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
      view_formats: &[],
    });
    gpu.queue.write_texture(
      wgpu::ImageCopyTexture {
        texture: &sprite_texture,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
      },
      &glow_sprite(SPRITE_SIZE),
      wgpu::ImageDataLayout {
        offset: 0,
        bytes_per_row: Some(4 * SPRITE_SIZE),
        rows_per_image: Some(SPRITE_SIZE),
      },
      sprite_extent,
    );
    let sprite_view = sprite_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sprite_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
      mag_filter: wgpu::FilterMode::Linear,
      min_filter: wgpu::FilterMode::Linear,
      ..Default::default()
    });
    let sprite_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      entries: &[
        wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::FRAGMENT,
          ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
          },
          count: None,
        },
        wgpu::BindGroupLayoutEntry {
          binding: 1,
          visibility: wgpu::ShaderStages::FRAGMENT,
          ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
          count: None,
        },
      ],
      label: Some("sprite_bind_group_layout"),
    });
    let sprite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &sprite_bind_group_layout,
      entries: &[
        wgpu::BindGroupEntry {
          binding: 0,
          resource: wgpu::BindingResource::TextureView(&sprite_view),
        },
        wgpu::BindGroupEntry {
          binding: 1,
          resource: wgpu::BindingResource::Sampler(&sprite_sampler),
        },
      ],
      label: Some("sprite_bind_group"),
    });

    // ========================================================================
    // particle pipeline
    // ========================================================================

    let particle_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("particles"),
      bind_group_layouts: &[
        &camera_bind_group_layout,
        &object_bind_group_layout,
        &sprite_bind_group_layout,
      ],
      push_constant_ranges: &[],
    });
    let particle_layout = wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<Particle>() as wgpu::BufferAddress, // pos3 + vel3 + color3 + size
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3, 3 => Float32],
    };
    let additive = wgpu::BlendState {
      color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
      },
      alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
      },
    };
    let particle_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Particle Pipeline"),
      layout: Some(&particle_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &particle_shader,
        entry_point: "main_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[particle_layout],
      },
      fragment: Some(wgpu::FragmentState {
        module: &particle_shader,
        entry_point: "main_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(wgpu::ColorTargetState {
          format: config.view_formats[0],
          blend: Some(additive),
          write_mask: wgpu::ColorWrites::ALL,
        })],
      }),
      primitive: wgpu::PrimitiveState::default(),
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    // ========================================================================
    // shell pipeline
    // ========================================================================

    let shell_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("shells"),
      bind_group_layouts: &[&camera_bind_group_layout, &object_bind_group_layout],
      push_constant_ranges: &[],
    });
    let shell_layout = wgpu::VertexBufferLayout {
      array_stride: 3 * 4,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![0 => Float32x3],
    };
    let shell_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Shell Pipeline"),
      layout: Some(&shell_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &shell_shader,
        entry_point: "main_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[shell_layout],
      },
      fragment: Some(wgpu::FragmentState {
        module: &shell_shader,
        entry_point: "main_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(wgpu::ColorTargetState {
          format: config.view_formats[0],
          blend: Some(wgpu::BlendState::ALPHA_BLENDING),
          write_mask: wgpu::ColorWrites::ALL,
        })],
      }),
      primitive: wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::LineList,
        ..Default::default()
      },
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    let shell_mesh = |i: usize, shell: &ShellParams| {
      let mesh = icosphere(shell.radius, shell.detail);
      let edges = wireframe_edges(&mesh);
      let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("Shell Vertices {i}")),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
      });
      let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("Shell Indices {i}")),
        contents: bytemuck::cast_slice(&edges),
        usage: wgpu::BufferUsages::INDEX,
      });
      let (uniform, bind_group) = object(&format!("shell {i}"));
      ShellMesh {
        vertices,
        indices,
        index_count: (edges.len() * 2) as u32,
        uniform,
        bind_group,
        color: shell.color,
        opacity: shell.opacity,
      }
    };
    let shells = [shell_mesh(0, &shells[0]), shell_mesh(1, &shells[1])];

    let sprite_scale = params.point_size / ((params.size_range[0] + params.size_range[1]) / 2.0);
    debug!(
      "renderer ready: {}x{} {:?}",
      config.width, config.height, config.view_formats[0]
    );

    Ok(Self {
      gpu,
      sprite_scale,
      resources: Some(Resources {
        surface,
        config,
        camera_buffer,
        camera_bind_group,
        cloud_uniform,
        cloud_bind_group,
        sprite_texture,
        sprite_bind_group,
        particle_buffer: None,
        particle_capacity: 0,
        particle_pipeline,
        shell_pipeline,
        shells,
      }),
    })
  }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
  wgpu::BindGroupLayoutEntry {
    binding,
    visibility,
    ty: wgpu::BindingType::Buffer {
      ty: wgpu::BufferBindingType::Uniform,
      has_dynamic_offset: false,
      min_binding_size: None,
    },
    count: None,
  }
}

impl Resources {
  fn acquire(&self, device: &wgpu::Device) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
    match self.surface.get_current_texture() {
      Ok(frame) => Ok(frame),
      Err(wgpu::SurfaceError::Timeout) => self.surface.get_current_texture(),
      Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
        warn!("surface outdated, reconfiguring");
        self.surface.configure(device, &self.config);
        self.surface.get_current_texture()
      }
      Err(e) => Err(e),
    }
  }

  /// The particle count is fixed, so this allocates once on the first frame.
  fn upload_particles(&mut self, gpu: &GpuContext, particles: &[Particle]) {
    if self.particle_buffer.is_none() || particles.len() > self.particle_capacity {
      if let Some(old) = self.particle_buffer.take() {
        old.destroy();
      }
      self.particle_buffer = Some(gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Particle Buffer"),
        contents: bytemuck::cast_slice(particles),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
      }));
      self.particle_capacity = particles.len();
    } else if let Some(buffer) = &self.particle_buffer {
      gpu.queue.write_buffer(buffer, 0, bytemuck::cast_slice(particles));
    }
  }
}

impl RenderTarget for FieldRenderer {
  fn resize(&mut self, viewport: Viewport) {
    let Some(resources) = self.resources.as_mut() else {
      return;
    };
    resources.config.width = viewport.width.max(1);
    resources.config.height = viewport.height.max(1);
    resources.surface.configure(&self.gpu.device, &resources.config);
  }

  fn render(&mut self, frame: &Frame<'_>) -> FieldResult<()> {
    let gpu = &self.gpu;
    let Some(resources) = self.resources.as_mut() else {
      return Err(FieldError::NotRunning);
    };

    gpu
      .queue
      .write_buffer(&resources.camera_buffer, 0, bytemuck::cast_slice(&[frame.camera]));
    let cloud = ObjectUniform::new(
      frame.transforms.cloud_model(),
      [1.0, 1.0, 1.0],
      PARTICLE_OPACITY,
      self.sprite_scale,
    );
    gpu
      .queue
      .write_buffer(&resources.cloud_uniform, 0, bytemuck::cast_slice(&[cloud]));
    for (shell, transform) in resources.shells.iter().zip(frame.transforms.shells.iter()) {
      let uniform = ObjectUniform::new(transform.model(), shell.color, shell.opacity, 0.0);
      gpu
        .queue
        .write_buffer(&shell.uniform, 0, bytemuck::cast_slice(&[uniform]));
    }
    if !frame.particles.is_empty() {
      resources.upload_particles(gpu, frame.particles);
    }

    let output = resources.acquire(&gpu.device)?;
    let view = output.texture.create_view(&wgpu::TextureViewDescriptor {
      format: Some(resources.config.view_formats[0]),
      ..wgpu::TextureViewDescriptor::default()
    });

    let mut command_encoder = gpu
      .device
      .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
      let mut rpass = command_encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: None,
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
          view: &view,
          resolve_target: None,
          ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(CLEAR_COLOR),
            store: wgpu::StoreOp::Store,
          },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
      });

      if let Some(particles) = &resources.particle_buffer {
        rpass.set_pipeline(&resources.particle_pipeline);
        rpass.set_bind_group(0, &resources.camera_bind_group, &[]);
        rpass.set_bind_group(1, &resources.cloud_bind_group, &[]);
        rpass.set_bind_group(2, &resources.sprite_bind_group, &[]);
        rpass.set_vertex_buffer(0, particles.slice(..));
        rpass.draw(0..6, 0..frame.particles.len() as u32);
      }

      rpass.set_pipeline(&resources.shell_pipeline);
      rpass.set_bind_group(0, &resources.camera_bind_group, &[]);
      for shell in &resources.shells {
        rpass.set_bind_group(1, &shell.bind_group, &[]);
        rpass.set_vertex_buffer(0, shell.vertices.slice(..));
        rpass.set_index_buffer(shell.indices.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..shell.index_count, 0, 0..1);
      }
    }
    gpu.queue.submit(Some(command_encoder.finish()));
    output.present();
    Ok(())
  }

  fn release(&mut self) {
    if let Some(resources) = self.resources.take() {
      if let Some(buffer) = &resources.particle_buffer {
        buffer.destroy();
      }
      for shell in &resources.shells {
        shell.vertices.destroy();
        shell.indices.destroy();
        shell.uniform.destroy();
      }
      resources.camera_buffer.destroy();
      resources.cloud_uniform.destroy();
      resources.sprite_texture.destroy();
      debug!("renderer released");
    }
  }
}
