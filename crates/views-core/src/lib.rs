#![warn(missing_docs)]
//! Views Core - Paragraph Text Sources and Multi-Pane Layout Synchronization
//!
//! # Overview
//!
//! `views-core` is the headless middle layer between a document model and a rendering engine.
//! It does not draw anything: it answers the questions a line-breaking engine asks about a
//! paragraph (text, formatting, lengths), converts offsets between the coordinate spaces a
//! paragraph lives in, and keeps several panes that display the same objects aligned.
//!
//! # Core Features
//!
//! - **Three coordinate spaces**: logical (stored text), rendered (placeholders replaced by
//!   their substitute strings) and search (placeholders omitted)
//! - **Composable capabilities**: substitutions, category overlays, spelling/IME overrides
//!   and concordance windows on one paragraph, in any combination
//! - **Segment breaking**: headless line breaking over any text source, with a measurement
//!   cache invalidated by content changes
//! - **Search**: plain, regex and whole-word search reported in logical offsets
//! - **Pane synchronization**: top-to-top gap alignment, queued lazy expansion, contraction
//!   and phased reconstruction across root boxes
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Synchronizer (multi-root coordination)     │  ← Layout Coordination
//! ├─────────────────────────────────────────────┤
//! │  Segments & Search                          │  ← Engine-Facing Queries
//! ├─────────────────────────────────────────────┤
//! │  ParagraphSource (overlay/override/window)  │  ← Capabilities
//! ├─────────────────────────────────────────────┤
//! │  Mapping (logical ⇄ rendered ⇄ search)      │  ← Coordinate Mapper
//! ├─────────────────────────────────────────────┤
//! │  BaseTextSource (runs, Rope)                │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Mapped paragraph
//!
//! ```rust
//! use std::sync::Arc;
//! use views_core::{
//!     CharProps, MappedRun, ParagraphSource, Run, Substitution, TextSource, WsRegistry,
//! };
//!
//! let style = Arc::new(CharProps::default());
//! let mut para = ParagraphSource::new(Arc::new(WsRegistry::new())).with_mapping();
//! para.append_mapped_run(MappedRun::new(
//!     Run::new("See \u{FFFC}.", style),
//!     vec![Substitution::new(4, "Figure 3")],
//! ))
//! .unwrap();
//!
//! assert_eq!(para.len(), 6);
//! assert_eq!(para.rendered_len(), 13);
//! assert_eq!(para.fetch(0..13), "See Figure 3.");
//! assert_eq!(para.log_to_ren(5), 12);
//! ```
//!
//! ## Line breaking
//!
//! ```rust
//! use std::sync::Arc;
//! use views_core::{
//!     BaseTextSource, BreakOptions, CellEngine, CharProps, Run, SegmentCache, WrapMode,
//!     WsRegistry, lay_out_lines,
//! };
//!
//! let src = BaseTextSource::from_runs(
//!     Arc::new(WsRegistry::new()),
//!     vec![Run::new("one two three", Arc::new(CharProps::default()))],
//! );
//! let options = BreakOptions { max_width: 8, wrap: WrapMode::Word };
//! let lines = lay_out_lines(&src, &CellEngine::default(), options, &mut SegmentCache::new());
//! assert_eq!(lines.len(), 2);
//! assert_eq!(lines[0].range, 0..8);
//! ```
//!
//! # Module Description
//!
//! - [`source`] - Text source contract and the unmapped base source
//! - [`mapping`] - Logical/rendered/search offset conversion
//! - [`paragraph`] - Composed paragraph source with optional capabilities
//! - [`overlay`] / [`overrides`] / [`concordance`] - The individual capabilities
//! - [`segment`] - Rendering-engine contract and line breaking
//! - [`search`] - Search over the search coordinate space
//! - [`sync`] - Multi-root layout synchronization
//!
//! # Unicode Support
//!
//! - All offsets count `char`s
//! - U+FFFC marks embedded objects and substitution placeholders
//! - Breaking respects grapheme clusters and UAX #29 word boundaries
//! - Cell widths follow UAX #11 in the reference engine

pub mod concordance;
pub mod delta;
pub mod error;
pub mod intervals;
pub mod mapping;
pub mod overlay;
pub mod overrides;
pub mod paragraph;
pub mod props;
pub mod search;
pub mod segment;
pub mod source;
pub mod sync;
pub mod ts_string;
pub mod writing_system;

pub use concordance::{ConcordanceOptions, ConcordanceWindow};
pub use delta::{ChangeSpan, ContentChange};
pub use error::{SyncError, TextSourceError};
pub use intervals::{Interval, IntervalTree};
pub use mapping::{Association, MapEntry, MappingTable, SearchOmissions};
pub use overlay::{CategoryStyle, CategoryTable, Overlay, OverlayLink, apply_overlay};
pub use overrides::{OverrideKind, OverrideLayer, PropOverride};
pub use paragraph::{MappedRun, ParagraphSource, Substitution};
pub use props::{
    CategoryId, CharProps, Color, DEFAULT_FONT, TextProps, Underline, UnderlineKind, WsId,
};
pub use search::{SearchError, SearchMatch, SearchOptions, find_all, find_next, find_prev};
pub use segment::{
    BreakOptions, CellEngine, Line, RenderEngine, Segment, SegmentCache, SegmentEnd, WrapMode,
    find_break_point, lay_out_lines,
};
pub use source::{BaseTextSource, Run, TextSource};
pub use sync::{
    BoxId, ExpandedRegion, Expansion, GapSide, LazyRange, ObjectId, PropTag, Rect, RootId,
    Size, SyncContext, SyncRequest, SyncRoot, SyncState, Synchronizer,
};
pub use ts_string::{OBJECT_REPLACEMENT, TsRun, TsString, TsStringBuilder};
pub use writing_system::{WritingSystem, WritingSystemFactory, WsRegistry};
