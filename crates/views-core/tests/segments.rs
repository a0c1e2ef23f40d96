//! Line breaking through the rendered-space interface.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use views_core::{
    BreakOptions, CategoryId, CategoryStyle, CategoryTable, CellEngine, CharProps, Color,
    ConcordanceOptions, ContentChange, Line, MappedRun, Overlay, OverrideKind, ParagraphSource,
    PropOverride, Run, SegmentCache, SegmentEnd, Substitution, TextProps, TextSource, TsString,
    UnderlineKind, WrapMode, WritingSystem, WsId, WsRegistry, find_break_point, lay_out_lines,
};

fn registry() -> Arc<WsRegistry> {
    Arc::new(
        WsRegistry::new()
            .with(WritingSystem::ltr(WsId(1), "en", "Charis SIL"))
            .with(WritingSystem::rtl(WsId(2), "he", "Ezra SIL")),
    )
}

fn plain() -> Arc<CharProps> {
    Arc::new(CharProps::for_ws(WsId(1)))
}

fn bold() -> Arc<CharProps> {
    Arc::new(CharProps {
        bold: true,
        ..CharProps::for_ws(WsId(1))
    })
}

fn paragraph(runs: Vec<Run>) -> ParagraphSource {
    let mut para = ParagraphSource::new(registry()).with_mapping();
    for run in runs {
        para.append_run(run);
    }
    para
}

fn lay_out(src: &dyn TextSource, max_width: u32, wrap: WrapMode) -> Vec<Line> {
    lay_out_lines(
        src,
        &CellEngine::default(),
        BreakOptions { max_width, wrap },
        &mut SegmentCache::new(),
    )
}

fn line_texts(src: &dyn TextSource, lines: &[Line]) -> Vec<String> {
    lines.iter().map(|line| src.fetch(line.range.clone())).collect()
}

/// Lines and segments tile `0..rendered_len` without gaps.
fn assert_tiles(src: &dyn TextSource, lines: &[Line]) {
    let mut pos = 0;
    for line in lines {
        assert_eq!(line.range.start, pos);
        for segment in &line.segments {
            assert_eq!(segment.range.start, pos);
            assert!(!segment.range.is_empty());
            pos = segment.range.end;
        }
        assert_eq!(line.range.end, pos);
        assert_eq!(
            line.width,
            line.segments.iter().map(|s| s.width).sum::<u32>()
        );
    }
    assert_eq!(pos, src.rendered_len());
}

#[test]
fn test_breaks_mapped_paragraph_in_rendered_space() {
    let mut para = ParagraphSource::new(registry()).with_mapping();
    para.append_mapped_run(MappedRun::new(
        Run::new("See \u{FFFC} now", plain()),
        vec![Substitution::new(4, "Figure 3")],
    ))
    .unwrap();
    assert_eq!(para.rendered_len(), 16);

    let lines = lay_out(&para, 10, WrapMode::Word);
    assert_tiles(&para, &lines);
    // The substitute is ordinary rendered text to the engine, so it may wrap inside.
    assert_eq!(line_texts(&para, &lines), vec!["See Figure", " 3 now"]);
    assert!(lines.iter().all(|line| line.width <= 10));
    assert_eq!(lines[0].segments.len(), 2);
    assert_eq!(lines[0].segments[1].end, SegmentEnd::WordBreak);

    // A break inside the substitute maps back to the placeholder.
    assert_eq!(para.ren_to_log(lines[1].range.start), 4);
    assert_eq!(para.ren_to_log(lines[1].range.end), 6);
}

#[test]
fn test_segments_never_cross_property_ranges() {
    let para = paragraph(vec![
        Run::new("plain and ", plain()),
        Run::new("bold", bold()),
        Run::new(" again", plain()),
    ]);
    let lines = lay_out(&para, 80, WrapMode::Word);
    assert_eq!(lines.len(), 1);
    assert_tiles(&para, &lines);

    let ranges: Vec<_> = lines[0].segments.iter().map(|s| s.range.clone()).collect();
    assert_eq!(ranges, vec![0..10, 10..14, 14..20]);
    for segment in &lines[0].segments {
        let (_, props_range) = para.char_props_at(segment.range.start);
        assert!(props_range.end >= segment.range.end);
    }
    assert_eq!(lines[0].segments[0].end, SegmentEnd::RunBoundary);
    assert_eq!(lines[0].segments[2].end, SegmentEnd::EndOfText);
}

#[test]
fn test_segment_reports_direction() {
    let rtl = Arc::new(CharProps::for_ws(WsId(2)));
    let para = paragraph(vec![Run::new("abc ", plain()), Run::new("שלום", rtl)]);
    let lines = lay_out(&para, 80, WrapMode::Word);
    let segments = &lines[0].segments;
    assert_eq!(segments.len(), 2);
    assert!(!segments[0].right_to_left);
    assert!(segments[1].right_to_left);
    assert_eq!(segments[1].ws, WsId(2));
}

#[test]
fn test_char_and_no_wrap_modes() {
    let para = paragraph(vec![Run::new("abcdefghij", plain())]);
    let lines = lay_out(&para, 4, WrapMode::Char);
    assert_tiles(&para, &lines);
    assert_eq!(line_texts(&para, &lines), vec!["abcd", "efgh", "ij"]);
    assert_eq!(lines[0].segments[0].end, SegmentEnd::CharBreak);

    let para = paragraph(vec![Run::new("ab cd\nef", plain())]);
    let lines = lay_out(&para, 2, WrapMode::None);
    assert_eq!(line_texts(&para, &lines), vec!["ab cd\n", "ef"]);
    assert_eq!(lines[0].segments[0].end, SegmentEnd::HardBreak);
}

#[test]
fn test_wide_characters_and_graphemes() {
    let para = paragraph(vec![Run::new("你好世界e\u{301}", plain())]);
    let lines = lay_out(&para, 4, WrapMode::Char);
    assert_eq!(line_texts(&para, &lines), vec!["你好", "世界", "e\u{301}"]);
    assert_eq!(lines[2].width, 1);
}

#[test]
fn test_break_point_respects_limit() {
    let para = paragraph(vec![Run::new("hello world", plain())]);
    let engine = CellEngine::default();
    let seg = find_break_point(&para, &engine, 0, 5, 80, WrapMode::Word, true).unwrap();
    assert_eq!(seg.range, 0..5);
    assert_eq!(seg.end, SegmentEnd::EndOfText);
    assert_eq!(
        find_break_point(&para, &engine, 5, 5, 80, WrapMode::Word, true),
        None
    );
}

#[test]
fn test_empty_source_has_one_empty_line() {
    let para = paragraph(Vec::new());
    let lines = lay_out(&para, 10, WrapMode::Word);
    assert_eq!(lines, vec![Line::default()]);
}

#[test]
fn test_invalidated_cache_matches_fresh_layout() {
    let mut rng = StdRng::seed_from_u64(11);
    let words = ["a", "bb", "ccc", "dddd", "eeeee", "ffffffffff"];
    let random_run = |rng: &mut StdRng| {
        let count = rng.gen_range(1..5);
        let text: Vec<&str> = (0..count)
            .map(|_| words[rng.gen_range(0..words.len())])
            .collect();
        let style = if rng.gen_bool(0.5) { plain() } else { bold() };
        Run::new(&*format!("{} ", text.join(" ")), style)
    };

    let engine = CellEngine::default();
    let options = BreakOptions {
        max_width: 12,
        wrap: WrapMode::Word,
    };
    for _ in 0..30 {
        let mut para = paragraph((0..4).map(|_| random_run(&mut rng)).collect());
        let mut cache = SegmentCache::new();
        lay_out_lines(&para, &engine, options, &mut cache);

        for _ in 0..5 {
            let n = para.run_count();
            let start = rng.gen_range(0..=n);
            let end = rng.gen_range(start..=n);
            let replacement: Vec<MappedRun> = (0..rng.gen_range(0..3))
                .map(|_| MappedRun::from(random_run(&mut rng)))
                .collect();
            let change = para.replace_contents(start..end, replacement).unwrap();
            cache.invalidate(&change);

            let cached = lay_out_lines(&para, &engine, options, &mut cache);
            let fresh = lay_out_lines(&para, &engine, options, &mut SegmentCache::new());
            assert_eq!(cached, fresh);
            assert_tiles(&para, &cached);
        }
    }
}

const NARROW: BreakOptions = BreakOptions {
    max_width: 12,
    wrap: WrapMode::Word,
};

fn squiggle() -> TextProps {
    TextProps::new().with_underline(UnderlineKind::Squiggle, Color::RED)
}

/// Invalidate `cache` for `change` and check it lays out like an empty cache.
fn relay_out(
    para: &ParagraphSource,
    options: BreakOptions,
    cache: &mut SegmentCache,
    change: &ContentChange,
) -> Vec<Line> {
    let engine = CellEngine::default();
    cache.invalidate(change);
    let cached = lay_out_lines(para, &engine, options, cache);
    let fresh = lay_out_lines(para, &engine, options, &mut SegmentCache::new());
    assert_eq!(cached, fresh);
    assert_tiles(para, &cached);
    cached
}

fn segment_ranges(lines: &[Line]) -> Vec<std::ops::Range<usize>> {
    lines
        .iter()
        .flat_map(|line| line.segments.iter().map(|s| s.range.clone()))
        .collect()
}

#[test]
fn test_cache_follows_override_layers() {
    let mut para = paragraph(vec![Run::new("aaaa bbbb cccc", plain())]);
    let mut cache = SegmentCache::new();
    let options = BreakOptions {
        max_width: 40,
        wrap: WrapMode::Word,
    };
    let lines = lay_out_lines(&para, &CellEngine::default(), options, &mut cache);
    assert_eq!(segment_ranges(&lines), vec![0..14]);

    let change = para.set_override_layer(
        OverrideKind::Spelling,
        vec![PropOverride::new(5..9, squiggle())],
    );
    assert_eq!(change.rendered.start, 5);
    assert_eq!(change.rendered.inserted_len, 4);
    let lines = relay_out(&para, options, &mut cache, &change);
    assert_eq!(segment_ranges(&lines), vec![0..5, 5..9, 9..14]);

    // Replacing the layer covers both the old and the new entries.
    let change = para.set_override_layer(
        OverrideKind::Spelling,
        vec![PropOverride::new(10..14, squiggle())],
    );
    assert_eq!(change.rendered.start, 5);
    let lines = relay_out(&para, options, &mut cache, &change);
    assert_eq!(segment_ranges(&lines), vec![0..10, 10..14]);

    let (layer, change) = para.clear_override_layer(OverrideKind::Spelling).unwrap();
    assert_eq!(layer.len(), 1);
    assert_eq!(change.rendered.start, 10);
    let lines = relay_out(&para, options, &mut cache, &change);
    assert_eq!(segment_ranges(&lines), vec![0..14]);
}

#[test]
fn test_cache_follows_concordance_window() {
    let mut para = paragraph(vec![
        Run::new("one two three ", plain()),
        Run::new("four five six ", bold()),
        Run::new("seven eight nine", plain()),
    ]);
    let mut cache = SegmentCache::new();
    lay_out_lines(&para, &CellEngine::default(), NARROW, &mut cache);

    let options = ConcordanceOptions {
        context_chars: 4,
        snap_to_words: true,
    };
    let change = para.set_concordance(19..23, true, options).unwrap();
    assert_eq!(change.rendered.start, 0);
    assert_eq!(change.rendered.deleted_len, para.full_len());
    assert_eq!(change.rendered.inserted_len, para.rendered_len());
    let lines = relay_out(&para, NARROW, &mut cache, &change);
    assert_eq!(line_texts(&para, &lines).concat(), "four five six");

    // Moving the window and clearing it both re-lay the whole view.
    let change = para.set_concordance(30..35, false, options).unwrap();
    relay_out(&para, NARROW, &mut cache, &change);
    let (_, change) = para.clear_concordance().unwrap();
    assert_eq!(change.rendered.inserted_len, para.full_len());
    relay_out(&para, NARROW, &mut cache, &change);
    assert!(para.clear_concordance().is_none());
}

#[test]
fn test_cache_follows_overlay_binding() {
    let overlay: Arc<dyn CategoryTable> = Arc::new(Overlay::new("notes").with_style(
        CategoryId(3),
        CategoryStyle {
            fore_color: Some(Color::BLUE),
            ..CategoryStyle::default()
        },
    ));
    let tagged = TsString::builder()
        .push("some plain text ", TextProps::new())
        .push("tagged words", TextProps::new().with_tags(vec![CategoryId(3)]))
        .build();
    let mut para = paragraph(vec![Run::new(tagged, plain())]);
    let mut cache = SegmentCache::new();
    lay_out_lines(&para, &CellEngine::default(), NARROW, &mut cache);

    let change = para.set_overlay(Some(Arc::downgrade(&overlay)));
    assert_eq!(change.rendered.start, 0);
    assert_eq!(change.rendered.inserted_len, para.rendered_len());
    relay_out(&para, NARROW, &mut cache, &change);
    assert_eq!(para.char_props_at(18).0.fore_color, Color::BLUE);

    let change = para.set_overlay(None);
    relay_out(&para, NARROW, &mut cache, &change);
}
