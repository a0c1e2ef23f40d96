//! Paragraph sources: a base text source plus optional capabilities.
//!
//! [`ParagraphSource`] composes one [`BaseTextSource`] with any combination of:
//!
//! - a [`MappingTable`] (hot links: placeholders rendered as substitute strings),
//! - an overlay link (category coloring),
//! - stacked [`OverrideLayer`]s (spelling squiggles, input-method attributes),
//! - a [`ConcordanceWindow`] (single-line view around one target).
//!
//! Each capability is a field checked at call time. Rendered-space properties are built in a
//! fixed order: base run and string props, substitute string props, overlay, overrides,
//! concordance bold. Offset math goes through the mapping, then the window.
//!
//! Structural queries (`run_containing`, `run_start`, `replace_contents`, ...) always use
//! full-paragraph logical offsets; the [`TextSource`] view is the windowed one.

use crate::concordance::{ConcordanceOptions, ConcordanceWindow};
use crate::delta::{ChangeSpan, ContentChange};
use crate::error::TextSourceError;
use crate::mapping::{Association, MappingTable};
use crate::overlay::{OverlayLink, apply_overlay};
use crate::overrides::{OverrideKind, OverrideLayer, PropOverride};
use crate::props::CharProps;
use crate::source::{BaseTextSource, Run, TextSource};
use crate::ts_string::{OBJECT_REPLACEMENT, TsString};
use crate::writing_system::WritingSystemFactory;
use std::ops::Range;
use std::sync::{Arc, Weak};

/// A placeholder character rendered as different text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Offset of the placeholder within its run.
    pub offset: usize,
    /// Rendered text (must not be empty).
    pub text: TsString,
}

impl Substitution {
    /// Create a substitution.
    pub fn new(offset: usize, text: impl Into<TsString>) -> Self {
        Self {
            offset,
            text: text.into(),
        }
    }
}

/// A run together with the substitutions for placeholders inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRun {
    /// The logical run.
    pub run: Run,
    /// Substitutions, by run-relative offset.
    pub substitutions: Vec<Substitution>,
}

impl MappedRun {
    /// A run with substitutions.
    pub fn new(run: Run, substitutions: Vec<Substitution>) -> Self {
        Self { run, substitutions }
    }
}

impl From<Run> for MappedRun {
    fn from(run: Run) -> Self {
        Self::new(run, Vec::new())
    }
}

/// Offsets of the visible part of the paragraph in each full-paragraph space.
#[derive(Debug, Clone, Copy)]
struct View {
    log_base: usize,
    log_len: usize,
    ren_base: usize,
    ren_len: usize,
    search_base: usize,
    search_len: usize,
}

/// Composed paragraph text source.
#[derive(Clone)]
pub struct ParagraphSource {
    base: BaseTextSource,
    mapping: Option<MappingTable>,
    overlay: Option<OverlayLink>,
    overrides: Vec<OverrideLayer>,
    window: Option<ConcordanceWindow>,
}

impl std::fmt::Debug for ParagraphSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParagraphSource")
            .field("base", &self.base)
            .field("mapping", &self.mapping)
            .field("overlay", &self.overlay.is_some())
            .field("overrides", &self.overrides)
            .field("window", &self.window)
            .finish()
    }
}

impl ParagraphSource {
    /// An empty paragraph with no capabilities.
    pub fn new(ws_factory: Arc<dyn WritingSystemFactory>) -> Self {
        Self::from_base(BaseTextSource::new(ws_factory))
    }

    /// Wrap an existing base source.
    pub fn from_base(base: BaseTextSource) -> Self {
        Self {
            base,
            mapping: None,
            overlay: None,
            overrides: Vec::new(),
            window: None,
        }
    }

    /// Enable substitutions.
    pub fn with_mapping(mut self) -> Self {
        self.mapping.get_or_insert_with(MappingTable::new);
        self
    }

    /// Bind to a category table.
    pub fn with_overlay(mut self, overlay: OverlayLink) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Rebind (or unbind) the category table. Every visible character may restyle.
    pub fn set_overlay(&mut self, overlay: Option<OverlayLink>) -> ContentChange {
        self.overlay = overlay;
        self.restyled(Some(0..self.base.len()))
    }

    /// Returns `true` if an overlay is bound and still alive.
    pub fn has_live_overlay(&self) -> bool {
        self.overlay
            .as_ref()
            .is_some_and(|link| Weak::strong_count(link) > 0)
    }

    /// The underlying base source.
    pub fn base(&self) -> &BaseTextSource {
        &self.base
    }

    /// The substitution table, if mapping is enabled.
    pub fn mapping(&self) -> Option<&MappingTable> {
        self.mapping.as_ref()
    }

    /// Number of runs.
    pub fn run_count(&self) -> usize {
        self.base.run_count()
    }

    /// Run `index`.
    pub fn run_at(&self, index: usize) -> &Run {
        self.base.run_at(index)
    }

    /// Full-paragraph logical start of run `index`.
    pub fn run_start(&self, index: usize) -> usize {
        self.base.run_start(index)
    }

    /// The run containing full-paragraph logical offset `ich_log`.
    pub fn run_containing(&self, ich_log: usize) -> Option<(usize, usize)> {
        self.base.run_containing(ich_log)
    }

    /// Full-paragraph logical length.
    pub fn full_len(&self) -> usize {
        self.base.len()
    }

    /// Full-paragraph logical text in `range`.
    pub fn fetch_logical(&self, range: Range<usize>) -> String {
        self.base.fetch_logical(range)
    }

    /// Runs `runs` with their substitutions, suitable for feeding back into
    /// [`Self::replace_contents`].
    pub fn mapped_runs(&self, runs: Range<usize>) -> Vec<MappedRun> {
        runs.map(|idx| {
            let start = self.base.run_start(idx);
            let run = self.base.run_at(idx).clone();
            let lim = start + run.len();
            let substitutions = self
                .mapping
                .iter()
                .flat_map(|m| m.entries())
                .filter(|e| e.ich_log >= start && e.ich_log < lim)
                .map(|e| Substitution::new(e.ich_log - start, e.text.clone()))
                .collect();
            MappedRun::new(run, substitutions)
        })
        .collect()
    }

    /// Replace runs `runs` with `new_runs`, recording their substitutions.
    ///
    /// Override ranges and the concordance target follow the edit; the concordance window
    /// is re-derived.
    ///
    /// # Errors
    ///
    /// Fails without modifying anything if the run range is invalid or a substitution is
    /// malformed (see [`TextSourceError`]).
    pub fn replace_contents(
        &mut self,
        runs: Range<usize>,
        new_runs: Vec<MappedRun>,
    ) -> Result<ContentChange, TextSourceError> {
        self.base.check_run_range(&runs)?;

        let mut substitutions = Vec::new();
        let mut plain_runs = Vec::with_capacity(new_runs.len());
        let mut pos = self.base.run_start(runs.start);
        for mapped in new_runs {
            let mut subs = mapped.substitutions;
            if !subs.is_empty() && self.mapping.is_none() {
                return Err(TextSourceError::MappingNotEnabled);
            }
            subs.sort_by_key(|s| s.offset);
            for (i, sub) in subs.iter().enumerate() {
                validate_substitution(&mapped.run, sub)?;
                if i > 0 && subs[i - 1].offset == sub.offset {
                    return Err(TextSourceError::DuplicateSubstitution { offset: sub.offset });
                }
            }
            substitutions.extend(subs.into_iter().map(|s| (pos + s.offset, s.text)));
            pos += mapped.run.len();
            plain_runs.push(mapped.run);
        }

        Ok(self.splice(runs, plain_runs, substitutions))
    }

    /// Append a run without substitutions.
    pub fn append_run(&mut self, run: Run) -> ContentChange {
        let n = self.base.run_count();
        self.splice(n..n, vec![run], Vec::new())
    }

    /// Splice validated runs; `substitutions` are absolute post-change logical offsets.
    fn splice(
        &mut self,
        runs: Range<usize>,
        new_runs: Vec<Run>,
        substitutions: Vec<(usize, TsString)>,
    ) -> ContentChange {
        let old_view_len = self.rendered_len();
        let ich_min = self.base.run_start(runs.start);
        let ren_start = self.full_log_to_ren(ich_min);
        let ren_old_lim = self.full_log_to_ren(self.base.run_start(runs.end));

        let inserted_runs = new_runs.len();
        let logical = self.base.splice_runs(runs.clone(), new_runs);
        if let Some(mapping) = &mut self.mapping {
            mapping.splice(logical, substitutions);
        }
        for layer in &mut self.overrides {
            layer.apply_edit(logical);
        }

        let mut rendered = ChangeSpan {
            start: ren_start,
            deleted_len: ren_old_lim - ren_start,
            inserted_len: self.full_log_to_ren(logical.new_end()) - ren_start,
        };

        if self.window.is_some() {
            let text = self.base.fetch_logical(0..self.base.len());
            if let Some(window) = &mut self.window {
                window.apply_edit(logical);
                window.adjust_discards(&text);
            }
            // The whole window may have moved.
            rendered = ChangeSpan {
                start: 0,
                deleted_len: old_view_len,
                inserted_len: self.rendered_len(),
            };
        }

        tracing::debug!(
            runs = ?runs,
            inserted_runs,
            logical_start = logical.start,
            rendered_start = rendered.start,
            "paragraph contents replaced"
        );
        ContentChange {
            runs,
            inserted_runs,
            logical,
            rendered,
        }
    }

    /// Append a run with substitutions.
    ///
    /// # Errors
    ///
    /// See [`Self::replace_contents`].
    pub fn append_mapped_run(&mut self, run: MappedRun) -> Result<ContentChange, TextSourceError> {
        let n = self.base.run_count();
        self.replace_contents(n..n, vec![run])
    }

    /// Install an override layer, replacing any layer of the same kind in place.
    ///
    /// The returned change covers the entries of both the old and the new layer.
    pub fn set_override_layer(
        &mut self,
        kind: OverrideKind,
        entries: Vec<PropOverride>,
    ) -> ContentChange {
        let layer = OverrideLayer::new(kind, entries);
        let mut affected = layer.extent();
        match self.overrides.iter_mut().find(|l| l.kind() == kind) {
            Some(slot) => {
                affected = union(affected, slot.extent());
                *slot = layer;
            }
            None => self.overrides.push(layer),
        }
        self.restyled(affected)
    }

    /// Remove the layer of `kind`, returning it with the span it no longer styles.
    pub fn clear_override_layer(
        &mut self,
        kind: OverrideKind,
    ) -> Option<(OverrideLayer, ContentChange)> {
        let idx = self.overrides.iter().position(|l| l.kind() == kind)?;
        let layer = self.overrides.remove(idx);
        let change = self.restyled(layer.extent());
        Some((layer, change))
    }

    /// The layer of `kind`.
    pub fn override_layer(&self, kind: OverrideKind) -> Option<&OverrideLayer> {
        self.overrides.iter().find(|l| l.kind() == kind)
    }

    /// Show only a window around `target` (full-paragraph logical offsets).
    ///
    /// # Errors
    ///
    /// Returns [`TextSourceError::InvalidTarget`] if `target` is reversed or out of bounds.
    pub fn set_concordance(
        &mut self,
        target: Range<usize>,
        bold_target: bool,
        options: ConcordanceOptions,
    ) -> Result<ContentChange, TextSourceError> {
        let len = self.base.len();
        if target.start > target.end || target.end > len {
            return Err(TextSourceError::InvalidTarget {
                start: target.start,
                end: target.end,
                len,
            });
        }
        let old_view_len = self.rendered_len();
        let text = self.base.fetch_logical(0..len);
        self.window = Some(ConcordanceWindow::new(target, bold_target, options, &text));
        Ok(self.reframed(old_view_len))
    }

    /// Show the whole paragraph again, returning the removed window with the change.
    pub fn clear_concordance(&mut self) -> Option<(ConcordanceWindow, ContentChange)> {
        let old_view_len = self.rendered_len();
        let window = self.window.take()?;
        Some((window, self.reframed(old_view_len)))
    }

    /// The concordance window, if any.
    pub fn concordance(&self) -> Option<&ConcordanceWindow> {
        self.window.as_ref()
    }

    /// A change restyling full-paragraph logical `range` without touching the text.
    /// `None` restyles nothing.
    fn restyled(&self, range: Option<Range<usize>>) -> ContentChange {
        let full_len = self.base.len();
        let range = range.map_or(full_len..full_len, |r| {
            r.start.min(full_len)..r.end.min(full_len)
        });
        let view = self.view();
        let start = clamp_into(self.full_log_to_ren(range.start), view.ren_base, view.ren_len);
        let end = clamp_into(self.full_log_to_ren(range.end), view.ren_base, view.ren_len);
        let ren_len = end.saturating_sub(start);
        tracing::debug!(?range, rendered_start = start, "paragraph restyled");
        ContentChange {
            runs: 0..0,
            inserted_runs: 0,
            logical: ChangeSpan {
                start: range.start,
                deleted_len: range.len(),
                inserted_len: range.len(),
            },
            rendered: ChangeSpan {
                start,
                deleted_len: ren_len,
                inserted_len: ren_len,
            },
        }
    }

    /// A change replacing the whole view after the concordance window moved.
    fn reframed(&self, old_view_len: usize) -> ContentChange {
        let full_len = self.base.len();
        let rendered = ChangeSpan {
            start: 0,
            deleted_len: old_view_len,
            inserted_len: self.rendered_len(),
        };
        tracing::debug!(
            old_len = old_view_len,
            new_len = rendered.inserted_len,
            "concordance window reframed"
        );
        ContentChange {
            runs: 0..0,
            inserted_runs: 0,
            logical: ChangeSpan {
                start: 0,
                deleted_len: full_len,
                inserted_len: full_len,
            },
            rendered,
        }
    }

    fn full_log_to_ren(&self, ich_log: usize) -> usize {
        self.mapping
            .as_ref()
            .map_or(ich_log, |m| m.log_to_ren(ich_log))
    }

    fn full_ren_to_log(&self, ich_ren: usize) -> usize {
        self.mapping
            .as_ref()
            .map_or(ich_ren, |m| m.ren_to_log(ich_ren))
    }

    fn view(&self) -> View {
        let full_len = self.base.len();
        let visible = match &self.window {
            Some(window) => window.visible(full_len),
            None => 0..full_len,
        };
        let ren_base = self.full_log_to_ren(visible.start);
        let search_base = self.base.omissions().log_to_search(visible.start);
        View {
            log_base: visible.start,
            log_len: visible.len(),
            ren_base,
            ren_len: self.full_log_to_ren(visible.end) - ren_base,
            search_base,
            search_len: self.base.omissions().log_to_search(visible.end) - search_base,
        }
    }

    /// Rendered text for a full-paragraph rendered range.
    fn full_fetch(&self, range: Range<usize>) -> String {
        let Some(mapping) = &self.mapping else {
            return self.base.fetch_logical(range);
        };
        let mut out = String::new();
        let mut pos = range.start;
        while pos < range.end {
            if let Some(entry) = mapping.substitution_at(pos) {
                let rs = entry.ich_ren_min();
                let lim = range.end.min(entry.ich_ren_lim);
                out.push_str(entry.text.slice(pos - rs..lim - rs));
                pos = lim;
                continue;
            }
            let ich_log = mapping.ren_to_log(pos);
            let next = mapping
                .first_at_or_after(ich_log)
                .map_or(range.end, |e| e.ich_ren_min())
                .min(range.end);
            out.push_str(&self.base.fetch_logical(ich_log..ich_log + (next - pos)));
            pos = next;
        }
        out
    }

    /// Properties at a full-paragraph rendered offset, with the full-paragraph rendered
    /// range sharing them and the logical offset they were resolved at.
    fn full_props_at(&self, ich_ren: usize) -> (CharProps, Range<usize>, usize) {
        let substitution = self.mapping.as_ref().and_then(|m| m.substitution_at(ich_ren));
        let (mut props, mut range, ich_log) = match substitution {
            Some(entry) => {
                let (mut props, _) = self.base.char_props_at(entry.ich_log);
                let rs = entry.ich_ren_min();
                let range = match entry.text.run_at(ich_ren - rs) {
                    Some((inner, overrides)) => {
                        props.apply(overrides);
                        rs + inner.start..rs + inner.end
                    }
                    None => rs..entry.ich_ren_lim,
                };
                (props, range, entry.ich_log)
            }
            None => {
                let ich_log = self.full_ren_to_log(ich_ren);
                let (props, log_range) = self.base.char_props_at(ich_log);
                let mut range =
                    self.full_log_to_ren(log_range.start)..self.full_log_to_ren(log_range.end);
                if let Some(mapping) = &self.mapping {
                    if let Some(prev) = mapping.last_before(ich_log) {
                        range.start = range.start.max(prev.ich_ren_lim);
                    }
                    if let Some(next) = mapping.first_at_or_after(ich_log) {
                        range.end = range.end.min(next.ich_ren_min());
                    }
                }
                (props, range, ich_log)
            }
        };

        if let Some(table) = self.overlay.as_ref().and_then(Weak::upgrade) {
            apply_overlay(&mut props, table.as_ref());
        }

        for layer in &self.overrides {
            layer.apply_at(ich_log, &mut props);
            let clip = layer.clip(ich_log, 0..self.base.len());
            range.start = range.start.max(self.full_log_to_ren(clip.start));
            range.end = range.end.min(self.full_log_to_ren(clip.end));
        }

        if let Some(window) = self.window.as_ref().filter(|w| w.bold_target()) {
            let target = window.target();
            let ren_start = self.full_log_to_ren(target.start);
            let ren_end = self.full_log_to_ren(target.end);
            if target.contains(&ich_log) {
                props.bold = true;
                range.start = range.start.max(ren_start);
                range.end = range.end.min(ren_end);
            } else if ich_log < target.start {
                range.end = range.end.min(ren_start);
            } else {
                range.start = range.start.max(ren_end);
            }
        }

        debug_assert!(range.contains(&ich_ren), "{range:?} misses {ich_ren}");
        (props, range, ich_log)
    }
}

fn validate_substitution(run: &Run, sub: &Substitution) -> Result<(), TextSourceError> {
    if sub.offset >= run.len() {
        return Err(TextSourceError::SubstitutionOutOfRange {
            offset: sub.offset,
            len: run.len(),
        });
    }
    if run.char_at(sub.offset) != Some(OBJECT_REPLACEMENT) {
        return Err(TextSourceError::NotAPlaceholder { offset: sub.offset });
    }
    if sub.text.is_empty() {
        return Err(TextSourceError::EmptySubstitution { offset: sub.offset });
    }
    Ok(())
}

/// `value - base`, clamped into `[0, len]`.
fn clamp_into(value: usize, base: usize, len: usize) -> usize {
    value.saturating_sub(base).min(len)
}

fn union(a: Option<Range<usize>>, b: Option<Range<usize>>) -> Option<Range<usize>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.start.min(b.start)..a.end.max(b.end)),
        (a, b) => a.or(b),
    }
}

impl TextSource for ParagraphSource {
    fn len(&self) -> usize {
        self.view().log_len
    }

    fn rendered_len(&self) -> usize {
        self.view().ren_len
    }

    fn search_len(&self) -> usize {
        self.view().search_len
    }

    fn fetch(&self, range: Range<usize>) -> String {
        let view = self.view();
        assert!(
            range.start <= range.end && range.end <= view.ren_len,
            "rendered range {range:?} out of range (length {})",
            view.ren_len
        );
        self.full_fetch(range.start + view.ren_base..range.end + view.ren_base)
    }

    fn fetch_search(&self, range: Range<usize>) -> String {
        let view = self.view();
        assert!(
            range.start <= range.end && range.end <= view.search_len,
            "search range {range:?} out of range (length {})",
            view.search_len
        );
        self.base
            .fetch_search(range.start + view.search_base..range.end + view.search_base)
    }

    fn char_props_at(&self, ich_ren: usize) -> (CharProps, Range<usize>) {
        let view = self.view();
        assert!(
            ich_ren < view.ren_len,
            "rendered offset {ich_ren} out of range (length {})",
            view.ren_len
        );
        let (props, range, _) = self.full_props_at(ich_ren + view.ren_base);
        let start = clamp_into(range.start, view.ren_base, view.ren_len);
        let end = clamp_into(range.end, view.ren_base, view.ren_len);
        (props, start..end)
    }

    fn log_to_ren(&self, ich_log: usize) -> usize {
        let view = self.view();
        assert!(
            ich_log <= view.log_len,
            "logical offset {ich_log} out of range (length {})",
            view.log_len
        );
        let full = self.full_log_to_ren(ich_log + view.log_base);
        clamp_into(full, view.ren_base, view.ren_len)
    }

    fn ren_to_log(&self, ich_ren: usize) -> usize {
        let view = self.view();
        assert!(
            ich_ren <= view.ren_len,
            "rendered offset {ich_ren} out of range (length {})",
            view.ren_len
        );
        let full = self.full_ren_to_log(ich_ren + view.ren_base);
        clamp_into(full, view.log_base, view.log_len)
    }

    fn log_to_search(&self, ich_log: usize) -> usize {
        let view = self.view();
        assert!(
            ich_log <= view.log_len,
            "logical offset {ich_log} out of range (length {})",
            view.log_len
        );
        let full = self
            .base
            .omissions()
            .log_to_search(ich_log + view.log_base);
        clamp_into(full, view.search_base, view.search_len)
    }

    fn search_to_log(&self, ich_search: usize, assoc: Association) -> usize {
        let view = self.view();
        assert!(
            ich_search <= view.search_len,
            "search offset {ich_search} out of range (length {})",
            view.search_len
        );
        let full = self
            .base
            .omissions()
            .search_to_log(ich_search + view.search_base, assoc);
        clamp_into(full, view.log_base, view.log_len)
    }
}
