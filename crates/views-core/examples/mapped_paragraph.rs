use std::sync::Arc;
use views_core::{
    BreakOptions, CellEngine, CharProps, Color, ConcordanceOptions, MappedRun, OverrideKind,
    ParagraphSource, PropOverride, Run, SearchOptions, SegmentCache, Substitution, TextProps,
    TextSource, UnderlineKind, WrapMode, WsRegistry, find_all, lay_out_lines,
};

fn main() {
    let style = Arc::new(CharProps::default());
    let mut para = ParagraphSource::new(Arc::new(WsRegistry::new())).with_mapping();
    para.append_run(Run::new("The results are summarized in ", style.clone()));
    para.append_mapped_run(MappedRun::new(
        Run::new("\u{FFFC} and discussed in ", style.clone()),
        vec![Substitution::new(0, "Table 2")],
    ))
    .unwrap();
    para.append_mapped_run(MappedRun::new(
        Run::new("\u{FFFC}.", style),
        vec![Substitution::new(0, "Section 4.1")],
    ))
    .unwrap();

    println!("logical length:  {}", para.len());
    println!("rendered length: {}", para.rendered_len());
    println!("search length:   {}", para.search_len());
    println!("rendered: {}", para.fetch(0..para.rendered_len()));

    for ich_log in [30, 31, para.len()] {
        let ich_ren = para.log_to_ren(ich_log);
        println!("log {ich_log:>3} -> ren {ich_ren:>3} -> log {}", para.ren_to_log(ich_ren));
    }

    let options = BreakOptions {
        max_width: 24,
        wrap: WrapMode::Word,
    };
    let lines = lay_out_lines(&para, &CellEngine::default(), options, &mut SegmentCache::new());
    for (i, line) in lines.iter().enumerate() {
        println!("line {i}: {:?}", para.fetch(line.range.clone()));
    }

    // Flag a word the way a spelling checker would.
    para.set_override_layer(
        OverrideKind::Spelling,
        vec![PropOverride::new(
            16..26,
            TextProps::new().with_underline(UnderlineKind::Squiggle, Color::RED),
        )],
    );
    let (underline, range) = para.underline_at(20);
    println!("underline at 20: {:?} over {range:?}", underline.kind);

    let matches = find_all(&para, "in  and", SearchOptions::default()).unwrap();
    println!("search across a placeholder: {matches:?}");

    para.set_concordance(
        16..26,
        true,
        ConcordanceOptions {
            context_chars: 8,
            snap_to_words: true,
        },
    )
    .unwrap();
    println!("concordance: {:?}", para.fetch(0..para.rendered_len()));
}
