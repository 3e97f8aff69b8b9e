use anyhow::Context as _;
use clap::Parser;
use gramlab::{
    analysis::{Analysis, Config},
    graph::AutomatonGraph,
    lr0,
};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    grammar: PathBuf,

    /// A file of words to derive, one per line.
    #[arg(long)]
    words: Option<PathBuf>,

    /// Write the automata in Graphviz DOT format into this directory.
    #[arg(long)]
    dot_dir: Option<PathBuf>,

    /// Print the complete parsing tables.
    #[arg(long)]
    tables: bool,

    /// Print the derivation tree of every derived word.
    #[arg(long)]
    trees: bool,

    #[arg(long)]
    skip_normalize: bool,

    #[arg(long)]
    skip_regular: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let source = fs::read_to_string(&args.grammar)
        .with_context(|| format!("failed to read the grammar file {}", args.grammar.display()))?;

    let mut config = Config::new();
    if args.skip_normalize {
        config.skip_normalize();
    }
    if args.skip_regular {
        config.skip_regular();
    }

    let started = Instant::now();
    let analysis = Analysis::analyze(&source, &config)?;
    tracing::info!(elapsed = ?started.elapsed(), "analysis finished");

    print!("{}", analysis.display());

    if args.tables {
        if let Some(table) = &analysis.ll1 {
            println!("\n# LL(1) table");
            print!("{}", table.display());
        }
        for table in [&analysis.slr1, &analysis.lr1, &analysis.lalr1].into_iter().flatten() {
            println!("\n# {} table", table.kind());
            print!("{}", table.display());
        }
    }

    if let Some(dir) = &args.dot_dir {
        write_graphs(&analysis, dir)?;
    }

    if let Some(path) = &args.words {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read the words file {}", path.display()))?;
        let words = analysis.tokenize(&text);

        let started = Instant::now();
        match (analysis.parser(), analysis.derive(&words)) {
            (Some(parser), Some(results)) => {
                tracing::info!(elapsed = ?started.elapsed(), words = words.len(), "words derived");
                println!("\n# Derivations ({})", parser);
                for mut result in results {
                    if !args.trees {
                        result.tree = None;
                    }
                    print!("{}", result.display(parser.grammar()));
                }
            }
            _ => println!("\n[warning] The grammar has no deterministic parser; no word was derived."),
        }
    }

    Ok(())
}

fn write_graphs(analysis: &Analysis, dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create the output directory {}", dir.display()))?;

    let g = analysis.grammar.augmented();
    let nfa = lr0::item_automaton(&g);
    let mut graphs = vec![(
        "lr0_items",
        AutomatonGraph::from_state_graph(
            &nfa,
            |symbol| g.symbol_name(*symbol).to_owned(),
            |item| item.display(&g).to_string(),
        ),
    )];
    for (name, table) in [
        ("slr1", &analysis.slr1),
        ("lr1", &analysis.lr1),
        ("lalr1", &analysis.lalr1),
    ] {
        if let Some(table) = table {
            graphs.push((name, AutomatonGraph::from_parse_table(table)));
        }
    }
    if let Some(regular) = &analysis.regular {
        graphs.push((
            "regular",
            AutomatonGraph::from_dfa(&regular.automaton.dfa, &analysis.grammar),
        ));
    }

    for (name, graph) in graphs {
        let path = dir.join(format!("{}.dot", name));
        fs::write(&path, graph.to_dot().to_string())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
