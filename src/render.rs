//! Drawing one frame.
//!
//! The viewer has a single opaque pass: clear to the background colour, then
//! draw every loaded part with the mesh pipeline and the shared material.

use std::iter;

use crate::{context::Context, data_structures::model::DrawModel, scene::Scene};

/// What the event loop should do after acquiring a frame failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// Reconfigure the surface with the current window size and try again on
    /// the next redraw.
    Reconfigure,
    /// Drop this frame.
    Skip,
    /// Log the error and keep going.
    Report,
}

impl Recovery {
    pub fn for_error(error: &wgpu::SurfaceError) -> Self {
        match error {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Recovery::Reconfigure,
            wgpu::SurfaceError::Timeout => Recovery::Skip,
            _ => Recovery::Report,
        }
    }
}

pub fn render(ctx: &Context, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
    let output = ctx.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&ctx.pipeline);
        for mesh in &scene.meshes {
            render_pass.draw_mesh(
                mesh,
                &ctx.material,
                &ctx.camera.bind_group,
                &ctx.light.bind_group,
            );
        }
    }

    ctx.queue.submit(iter::once(encoder.finish()));
    output.present();
    Ok(())
}
