// src/bin/probe.rs
// Prints what the matcher and deriver make of hand-written strands.
use clap::Parser;
use oracle_core::core::deriver::HierarchicalWordDeriver;
use oracle_core::core::letters::Strand;
use oracle_core::core::matcher::WordMatcher;
use oracle_core::OracleError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oracle_probe", version, about)]
struct Cli {
    /// Strands to inspect, e.g. STARTLEAPRO
    #[arg(required = true)]
    strands: Vec<String>,

    #[arg(long)]
    dictionary: Option<PathBuf>,

    #[arg(long, default_value_t = 3)]
    max_words: usize,

    #[arg(long, default_value_t = 2)]
    secondary_limit: usize,

    /// Exhaustive matches shown per strand
    #[arg(long, default_value_t = 20)]
    show: usize,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    oracle_core::init_tracing(cli.verbose);

    let dictionary = oracle_core::load_dictionary(cli.dictionary.as_deref())?;
    if dictionary.is_empty() {
        return Err(OracleError::DictionaryEmpty.into());
    }
    let table = dictionary.snapshot();
    let matcher = WordMatcher::default();
    let deriver = HierarchicalWordDeriver::new(cli.secondary_limit);

    for raw in &cli.strands {
        let strand: Strand = raw.parse()?;
        println!("Strand {} ({} letters)", strand, strand.len());

        let all = matcher.find_all_words(&table, &strand);
        let shown: Vec<&str> = all.iter().take(cli.show).map(String::as_str).collect();
        println!("  formable: {} words; longest: {}", all.len(), shown.join(", "));

        let greedy = matcher.find_independent_words(&table, strand.letters(), cli.max_words);
        println!("  greedy:   {}", greedy.join(", "));

        for primary in &greedy {
            println!("    {}", primary);
            for secondary in deriver.derive_secondary(&table, primary) {
                match deriver.derive_tertiary(&table, &secondary) {
                    Some(tertiary) => println!("      {} -> {}", secondary, tertiary),
                    None => println!("      {}", secondary),
                }
            }
        }
        println!();
    }
    Ok(())
}
