//! Overlay, override and concordance capabilities of `ParagraphSource`.

use pretty_assertions::assert_eq;
use std::sync::{Arc, Weak};
use views_core::{
    CategoryId, CategoryStyle, CategoryTable, CharProps, Color, ConcordanceOptions, MappedRun,
    Overlay, OverrideKind, ParagraphSource, PropOverride, Run, Substitution, TextProps,
    TextSource, TextSourceError, TsString, UnderlineKind, WsId, WsRegistry,
};

fn style() -> Arc<CharProps> {
    Arc::new(CharProps::for_ws(WsId(1)))
}

fn paragraph(runs: &[&str]) -> ParagraphSource {
    let mut para = ParagraphSource::new(Arc::new(WsRegistry::new())).with_mapping();
    for text in runs {
        para.append_run(Run::new(*text, style()));
    }
    para
}

fn squiggle() -> TextProps {
    TextProps::new().with_underline(UnderlineKind::Squiggle, Color::RED)
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

#[test]
fn test_overlay_colors_tagged_text_until_dropped() {
    let overlay: Arc<dyn CategoryTable> = Arc::new(Overlay::new("notes").with_style(
        CategoryId(7),
        CategoryStyle {
            fore_color: Some(Color::BLUE),
            back_color: Some(Color::rgb(255, 255, 0)),
            ..CategoryStyle::default()
        },
    ));

    let tagged = TsString::builder()
        .push("plain ", TextProps::new())
        .push("noted", TextProps::new().with_tags(vec![CategoryId(7)]))
        .build();
    let mut para = ParagraphSource::new(Arc::new(WsRegistry::new()))
        .with_overlay(Arc::downgrade(&overlay));
    para.append_run(Run::new(tagged, style()));
    assert!(para.has_live_overlay());

    let (props, range) = para.char_props_at(8);
    assert_eq!(props.fore_color, Color::BLUE);
    assert_eq!(props.back_color, Color::rgb(255, 255, 0));
    assert_eq!(range, 6..11);
    assert_eq!(para.char_props_at(0).0.fore_color, Color::BLACK);

    // Offsets are untouched by the overlay.
    assert_eq!(para.rendered_len(), para.len());

    drop(overlay);
    assert!(!para.has_live_overlay());
    assert_eq!(para.char_props_at(8).0.fore_color, Color::BLACK);
}

#[test]
fn test_overlay_can_be_rebound() {
    let first: Arc<dyn CategoryTable> = Arc::new(Overlay::new("first").with_style(
        CategoryId(1),
        CategoryStyle {
            fore_color: Some(Color::RED),
            ..CategoryStyle::default()
        },
    ));
    let mut para = paragraph(&[]);
    para.append_run(Run::new(
        TsString::with_props("x", TextProps::new().with_tags(vec![CategoryId(1)])),
        style(),
    ));
    assert_eq!(para.char_props_at(0).0.fore_color, Color::BLACK);

    para.set_overlay(Some(Arc::downgrade(&first)));
    assert_eq!(para.char_props_at(0).0.fore_color, Color::RED);

    let unbound: Option<Weak<dyn CategoryTable>> = None;
    para.set_overlay(unbound);
    assert_eq!(para.char_props_at(0).0.fore_color, Color::BLACK);
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

#[test]
fn test_spelling_layer_follows_edits() {
    let mut para = paragraph(&["Intro. ", "This is a tset."]);
    // "tset" is at 7 + 10.
    para.set_override_layer(
        OverrideKind::Spelling,
        vec![PropOverride::new(17..21, squiggle())],
    );

    let (underline, range) = para.underline_at(18);
    assert_eq!(underline.kind, UnderlineKind::Squiggle);
    assert_eq!(underline.color, Color::RED);
    assert_eq!(range, 17..21);
    assert_eq!(para.char_props_at(0).1, 0..17);
    assert_eq!(para.char_props_at(21).1, 21..22);

    para.replace_contents(0..1, vec![Run::new("Hi. ", style()).into()])
        .unwrap();
    let (underline, range) = para.underline_at(15);
    assert_eq!(underline.kind, UnderlineKind::Squiggle);
    assert_eq!(range, 14..18);
    assert_eq!(
        para.override_layer(OverrideKind::Spelling)
            .map(|layer| layer.entries()),
        Some(vec![PropOverride::new(14..18, squiggle())])
    );
}

#[test]
fn test_override_on_substituted_placeholder() {
    let mut para = paragraph(&[]);
    para.append_mapped_run(MappedRun::new(
        Run::new("a\u{FFFC}b", style()),
        vec![Substitution::new(1, "XYZ")],
    ))
    .unwrap();
    para.set_override_layer(
        OverrideKind::Spelling,
        vec![PropOverride::new(1..2, squiggle())],
    );

    let (props, range) = para.char_props_at(2);
    assert_eq!(props.underline, UnderlineKind::Squiggle);
    assert_eq!(range, 1..4);
    assert_eq!(para.char_props_at(0).1, 0..1);
    let (props, range) = para.char_props_at(4);
    assert_eq!(props.underline, UnderlineKind::None);
    assert_eq!(range, 4..5);
}

#[test]
fn test_stacked_layers_apply_in_order() {
    let mut para = paragraph(&["compose"]);
    para.set_override_layer(
        OverrideKind::Spelling,
        vec![PropOverride::new(0..7, squiggle())],
    );
    para.set_override_layer(
        OverrideKind::InputMethod,
        vec![PropOverride::new(
            2..4,
            TextProps::new().with_underline(UnderlineKind::Single, Color::BLACK),
        )],
    );

    assert_eq!(para.underline_at(0).0.kind, UnderlineKind::Squiggle);
    let (underline, range) = para.underline_at(3);
    assert_eq!(underline.kind, UnderlineKind::Single);
    assert_eq!(range, 2..4);

    // Replacing a layer keeps its position in the stack.
    para.set_override_layer(OverrideKind::Spelling, Vec::new());
    assert_eq!(para.underline_at(0).0.kind, UnderlineKind::None);
    assert!(para.clear_override_layer(OverrideKind::InputMethod).is_some());
    assert!(para.override_layer(OverrideKind::InputMethod).is_none());
    assert_eq!(para.char_props_at(3).1, 0..7);
}

// ---------------------------------------------------------------------------
// Concordance
// ---------------------------------------------------------------------------

fn words(count: usize) -> String {
    "word ".repeat(count)
}

#[test]
fn test_concordance_sum_identity_and_bold_target() {
    let mut para = paragraph(&[&words(200)]);
    assert_eq!(para.len(), 1000);
    para.set_concordance(100..120, true, ConcordanceOptions::default())
        .unwrap();

    let window = para.concordance().cloned().unwrap();
    let di = window.discard_initial();
    let df = window.discard_final();
    assert_eq!(di + para.len() + df, 1000);
    assert!(di <= 100 && 1000 - df >= 120);
    assert!(para.len() < 1000);

    let (props, range) = para.char_props_at(para.log_to_ren(100 - di));
    assert!(props.bold);
    assert_eq!(range, 100 - di..120 - di);
    for ich in [100 - di, 110 - di, 119 - di] {
        assert!(para.char_props_at(ich).0.bold);
    }
    assert!(!para.char_props_at(0).0.bold);
    assert!(!para.char_props_at(para.rendered_len() - 1).0.bold);
}

#[test]
fn test_concordance_window_contents() {
    let text = "abcdefghij".repeat(10);
    let mut para = paragraph(&[&text]);
    let options = ConcordanceOptions {
        context_chars: 5,
        snap_to_words: false,
    };
    para.set_concordance(50..53, false, options).unwrap();

    assert_eq!(para.len(), 13);
    assert_eq!(para.fetch(0..13), text[45..58]);
    assert_eq!(para.search_len(), 13);
    assert!(!para.char_props_at(6).0.bold);

    // Results are clamped into the window.
    assert_eq!(para.log_to_ren(13), 13);
    assert_eq!(para.ren_to_log(13), 13);

    para.clear_concordance();
    assert_eq!(para.len(), 100);
}

#[test]
fn test_concordance_tracks_edits_before_target() {
    let mut para = paragraph(&[&"a".repeat(50), &"b".repeat(50), &"c".repeat(100)]);
    let options = ConcordanceOptions {
        context_chars: 40,
        snap_to_words: false,
    };
    para.set_concordance(100..120, true, options).unwrap();
    assert_eq!(para.fetch(0..para.rendered_len()), format!("{}{}", "b".repeat(40), "c".repeat(60)));

    let change = para
        .replace_contents(0..1, vec![Run::new(&*"a".repeat(10), style()).into()])
        .unwrap();
    let window = para.concordance().cloned().unwrap();
    assert_eq!(window.target(), 60..80);
    assert_eq!(window.discard_initial(), 20);
    assert_eq!(para.fetch(0..para.rendered_len()), format!("{}{}", "b".repeat(40), "c".repeat(60)));

    // The whole window is reported as changed.
    assert_eq!(change.rendered.start, 0);
    assert_eq!(change.rendered.inserted_len, para.rendered_len());
}

#[test]
fn test_concordance_with_substitution() {
    let mut para = paragraph(&[]);
    para.append_mapped_run(MappedRun::new(
        Run::new("see \u{FFFC} now", style()),
        vec![Substitution::new(4, "FIG")],
    ))
    .unwrap();
    para.set_concordance(
        4..5,
        true,
        ConcordanceOptions {
            context_chars: 1,
            snap_to_words: false,
        },
    )
    .unwrap();

    assert_eq!(para.len(), 3);
    assert_eq!(para.fetch(0..para.rendered_len()), " FIG ");
    let (props, range) = para.char_props_at(2);
    assert!(props.bold);
    assert_eq!(range, 1..4);
}

#[test]
fn test_concordance_rejects_bad_target() {
    let mut para = paragraph(&["short"]);
    assert_eq!(
        para.set_concordance(3..9, true, ConcordanceOptions::default())
            .unwrap_err(),
        TextSourceError::InvalidTarget {
            start: 3,
            end: 9,
            len: 5
        }
    );
    assert!(para.concordance().is_none());
}

#[test]
fn test_concordance_with_unbounded_context() {
    for snap_to_words in [false, true] {
        let mut para = paragraph(&["alpha ", "beta gamma ", "delta"]);
        let options = ConcordanceOptions {
            context_chars: usize::MAX,
            snap_to_words,
        };
        let change = para.set_concordance(6..10, true, options).unwrap();
        assert_eq!(para.len(), para.full_len());
        assert_eq!(para.fetch(0..para.rendered_len()), "alpha beta gamma delta");
        assert_eq!(change.rendered.start, 0);
        assert_eq!(change.rendered.inserted_len, para.rendered_len());
        assert!(para.char_props_at(7).0.bold);
    }
}
