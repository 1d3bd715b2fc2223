//! Text overlay
//!
//! Paints the overlay block in a translucent panel pinned to the top-left
//! corner, in its own pass on top of the scene. egui only lays out and
//! tessellates here; there is no input handling.

const OVERLAY_ID: &str = "stress-overlay";
const OVERLAY_OFFSET: f32 = 12.0;
const OVERLAY_FONT_SIZE: f32 = 12.0;

pub struct OverlayPainter {
    ctx: egui::Context,
    renderer: egui_wgpu::Renderer,
}

/// One egui frame covering a `size` pixel target.
fn overlay_input(size: [u32; 2], pixels_per_point: f32) -> egui::RawInput {
    let points = egui::vec2(size[0] as f32, size[1] as f32) / pixels_per_point;
    let mut input = egui::RawInput {
        screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, points)),
        ..Default::default()
    };
    input
        .viewports
        .entry(egui::ViewportId::ROOT)
        .or_default()
        .native_pixels_per_point = Some(pixels_per_point);
    input
}

fn layout(ctx: &egui::Context, text: &str) {
    egui::Area::new(egui::Id::new(OVERLAY_ID))
        .fixed_pos(egui::pos2(OVERLAY_OFFSET, OVERLAY_OFFSET))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(egui::Color32::from_black_alpha(128))
                .rounding(10.0)
                .inner_margin(egui::Margin::symmetric(12.0, 10.0))
                .show(ui, |ui| {
                    let text = egui::RichText::new(text)
                        .monospace()
                        .size(OVERLAY_FONT_SIZE)
                        .color(egui::Color32::WHITE);
                    ui.add(egui::Label::new(text).extend());
                });
        });
}

impl OverlayPainter {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        Self {
            ctx: egui::Context::default(),
            renderer: egui_wgpu::Renderer::new(device, format, None, 1, false),
        }
    }

    /// Record the overlay pass into `encoder`. The returned command buffers
    /// must be submitted ahead of the encoder.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        text: &str,
        screen: &egui_wgpu::ScreenDescriptor,
    ) -> Vec<wgpu::CommandBuffer> {
        let input = overlay_input(screen.size_in_pixels, screen.pixels_per_point);
        let output = self.ctx.run(input, |ctx| layout(ctx, text));
        let paint_jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);

        for (id, delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let commands = self
            .renderer
            .update_buffers(device, queue, encoder, &paint_jobs, screen);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Overlay Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.renderer.render(&mut pass, &paint_jobs, screen);
        }
        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_measured_in_points() {
        let input = overlay_input([1600, 1200], 2.0);
        let rect = input.screen_rect.unwrap();
        assert_eq!(rect.size(), egui::vec2(800.0, 600.0));
        assert_eq!(
            input.viewports[&egui::ViewportId::ROOT].native_pixels_per_point,
            Some(2.0)
        );
    }

    #[test]
    fn panel_is_pinned_top_left() {
        let ctx = egui::Context::default();
        let text = "3D Stress Test (Instanced)\ncount=10, size=1, speed=1";
        let mut output = ctx.run(overlay_input([800, 600], 1.0), |ctx| layout(ctx, text));
        // A new area may spend its first frame measuring itself.
        if output.shapes.is_empty() {
            output = ctx.run(overlay_input([800, 600], 1.0), |ctx| layout(ctx, text));
        }

        assert!(!output.shapes.is_empty());
        let rect = ctx
            .memory(|memory| memory.area_rect(egui::Id::new(OVERLAY_ID)))
            .unwrap();
        assert_eq!(rect.min, egui::pos2(OVERLAY_OFFSET, OVERLAY_OFFSET));
        assert!(rect.width() > 0.0 && rect.height() > 0.0);
    }
}
