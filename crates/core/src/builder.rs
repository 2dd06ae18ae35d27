//! Page text layer lifecycle
//!
//! Glyph runs stream in during layout, text content arrives separately, and
//! the expensive alignment pass waits for scrolling to settle. The builder
//! ties the assembler, the overlay and the surface together and enforces the
//! ordering between those steps.

use crate::alignment::{align_spans, AlignmentStats};
use crate::config::TextLayerConfig;
use crate::find::FindController;
use crate::geometry::{GlyphRunGeometry, TextContentItem};
use crate::highlight::{Match, MatchOverlay, OverlayUpdate};
use crate::surface::{detach, materialize, repaint, LayerSurface, MaterializedLayer};
use crate::text_layer::LayerTree;
use crate::text_layout::LayoutAssembler;
use std::time::Instant;
use textlayer_scheduler::{DeferredTask, Readiness};

/// Host state passed into each lifecycle call
#[derive(Clone, Copy)]
pub struct LayerContext<'a> {
    /// Current time on the host's clock
    pub now: Instant,

    /// Time of the last scroll event, if any
    pub last_scroll: Option<Instant>,

    /// Find controller, if the viewer has one
    pub find: Option<&'a dyn FindController>,
}

impl<'a> LayerContext<'a> {
    pub fn new(now: Instant) -> Self {
        Self {
            now,
            last_scroll: None,
            find: None,
        }
    }

    pub fn with_last_scroll(mut self, last_scroll: Instant) -> Self {
        self.last_scroll = Some(last_scroll);
        self
    }

    pub fn with_find(mut self, find: &'a dyn FindController) -> Self {
        self.find = Some(find);
        self
    }
}

/// Text layer of one page
pub struct TextLayerBuilder<S: LayerSurface> {
    page_index: usize,
    config: TextLayerConfig,
    surface: S,
    assembler: LayoutAssembler,
    content: Option<Vec<TextContentItem>>,
    layout_done: bool,
    content_attached: bool,
    rendering_done: bool,
    render_task: DeferredTask,
    overlay: MatchOverlay,
    layer: MaterializedLayer<S::Element>,
}

impl<S: LayerSurface> TextLayerBuilder<S> {
    /// Create the layer for `page_index`, drawing onto `surface`
    pub fn new(page_index: usize, config: TextLayerConfig, surface: S) -> Self {
        Self {
            page_index,
            assembler: LayoutAssembler::new(config.enable_multiline),
            render_task: DeferredTask::new(config.render_delay()),
            config,
            surface,
            content: None,
            layout_done: false,
            content_attached: false,
            rendering_done: false,
            overlay: MatchOverlay::new(),
            layer: MaterializedLayer::default(),
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn config(&self) -> &TextLayerConfig {
        &self.config
    }

    /// The layer tree built so far
    pub fn tree(&self) -> &LayerTree {
        self.assembler.tree()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Surface handles, empty until the layer is rendered
    pub fn layer(&self) -> &MaterializedLayer<S::Element> {
        &self.layer
    }

    /// Matches currently painted
    pub fn matches(&self) -> &[Match] {
        self.overlay.matches()
    }

    pub fn is_layout_done(&self) -> bool {
        self.layout_done
    }

    pub fn is_content_attached(&self) -> bool {
        self.content_attached
    }

    pub fn is_rendered(&self) -> bool {
        self.rendering_done
    }

    /// Whether an alignment pass is waiting for scrolling to settle
    pub fn is_render_pending(&self) -> bool {
        self.render_task.is_pending()
    }

    /// When the pending alignment pass comes due
    pub fn next_render_due(&self) -> Option<Instant> {
        self.render_task.next_due()
    }

    /// Start a fresh layout, dropping anything built or rendered before
    pub fn begin_layout(&mut self) {
        self.render_task.cancel();
        detach(&mut self.layer, &mut self.surface);
        self.assembler.reset();
        self.overlay = MatchOverlay::new();
        self.layout_done = false;
        self.content_attached = false;
        self.rendering_done = false;
    }

    /// Add one glyph run
    pub fn append_text(&mut self, geom: &GlyphRunGeometry) {
        self.assembler.append(geom);
    }

    /// Mark layout finished and attach content if it already arrived
    pub fn end_layout(&mut self, ctx: &LayerContext<'_>) {
        self.layout_done = true;
        self.insert_content(ctx);
    }

    /// Hand over the page's text content, one item per glyph run
    pub fn set_text_content(&mut self, items: Vec<TextContentItem>, ctx: &LayerContext<'_>) {
        self.content = Some(items);
        self.insert_content(ctx);
    }

    /// Attach content to the spans once layout is done and content is known
    ///
    /// Returns whether content was attached by this call. Later calls are
    /// no-ops.
    pub fn insert_content(&mut self, ctx: &LayerContext<'_>) -> bool {
        if !self.layout_done || self.content_attached {
            log::debug!(
                "page {}: content not attached (layout done: {}, already attached: {})",
                self.page_index,
                self.layout_done,
                self.content_attached
            );
            return false;
        }
        let Some(items) = self.content.take() else {
            return false;
        };

        self.content_attached = true;
        let filled = self.assembler.tree_mut().attach_content(&items);
        log::debug!("page {}: attached content to {filled} spans", self.page_index);

        self.request_render(ctx);
        true
    }

    /// Run the alignment pass now, or defer it while the user is scrolling
    pub fn request_render(&mut self, ctx: &LayerContext<'_>) {
        match self.render_task.request(ctx.now, ctx.last_scroll) {
            Readiness::RunNow => {
                self.render_layer(ctx);
            }
            Readiness::Deferred { due, .. } => {
                log::debug!(
                    "page {}: render deferred by {:?}",
                    self.page_index,
                    due.saturating_duration_since(ctx.now)
                );
            }
        }
    }

    /// Drive a deferred alignment pass; returns whether it ran
    pub fn poll(&mut self, ctx: &LayerContext<'_>) -> bool {
        if !self.render_task.poll(ctx.now, ctx.last_scroll) {
            return false;
        }
        self.render_layer(ctx);
        true
    }

    /// Finish layout, align spans, put the layer on the surface and paint matches
    ///
    /// A tree with more spans than `max_spans_to_render` is left off the
    /// surface and the layer stays unrendered.
    pub fn render_layer(&mut self, ctx: &LayerContext<'_>) -> AlignmentStats {
        self.assembler.finalize();
        detach(&mut self.layer, &mut self.surface);

        let span_count = self.assembler.tree().span_count();
        if span_count > self.config.max_spans_to_render {
            log::warn!(
                "page {}: {span_count} spans exceed {}, not rendering",
                self.page_index,
                self.config.max_spans_to_render
            );
            self.rendering_done = false;
            return AlignmentStats::default();
        }

        let stats = align_spans(self.assembler.tree_mut(), &mut self.surface);
        self.layer = materialize(self.assembler.tree(), &mut self.surface);
        self.rendering_done = true;
        log::debug!(
            "page {}: rendered {} blocks ({} aligned, {} whitespace, {} zero width)",
            self.page_index,
            self.layer.blocks.len(),
            stats.aligned,
            stats.whitespace,
            stats.zero_width
        );

        self.update_matches(ctx);
        stats
    }

    /// Clear the previous highlights and paint the controller's current matches
    pub fn update_matches(&mut self, ctx: &LayerContext<'_>) -> OverlayUpdate {
        if !self.rendering_done {
            return OverlayUpdate::default();
        }

        let request = ctx.find.and_then(|find| find.match_request(self.page_index));
        let update = self
            .overlay
            .update(self.assembler.tree_mut().spans_mut(), request);
        repaint(self.assembler.tree(), &self.layer, &mut self.surface, &update.dirty);

        if let Some(span) = update.scroll_to {
            if !self.config.presentation_mode {
                if let Some(element) = self.layer.span_element(span) {
                    self.surface
                        .scroll_into_view(element, self.config.scroll_offset);
                }
            }
        }

        update
    }

    /// Cancel pending work and take the layer off the surface
    pub fn teardown(&mut self) {
        if self.render_task.cancel() {
            log::debug!("page {}: cancelled pending render", self.page_index);
        }
        detach(&mut self.layer, &mut self.surface);
    }
}

impl<S: LayerSurface> Drop for TextLayerBuilder<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
