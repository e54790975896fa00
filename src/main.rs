//! Command-line host: decode a chromatogram, summarize it, and run the sequence analyses on request.
//!
//! ```bash
//! chromatrace read.ab1
//! chromatrace read.scf --revcomp --orfs --min-orf 90 --frames +1,-2
//! chromatrace read.ab1 --enzymes --enzyme EcoRI --enzyme BamHI --json
//! chromatrace read.ab1 --fasta
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use chromatrace::{
    chromatogram::SequenceModel,
    file_io::{
        self,
        save::{export_fasta, AnalysisPrefs, DEFAULT_PREFS_FILE},
    },
    reading_frame::{find_orfs, Orf, ReadingFrame},
    restriction_enzyme::{
        find_restriction_sites, load_re_library, match_counts, select_enzymes, RestrictionEnzyme,
        RestrictionSite,
    },
    util::RangeIncl,
};

const ZTR_MESSAGE: &str = "ZTR format is not supported; convert to AB1 or SCF";

/// Everything we print with `--json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    file: String,
    reverse_complemented: bool,
    model: &'a SequenceModel,
    mean_quality: f32,
    low_quality_positions: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orfs: Option<Vec<Orf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    restriction_sites: Option<Vec<RestrictionSite>>,
}

fn cli() -> Command {
    Command::new("chromatrace")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Decode AB1 and SCF chromatograms, and analyze the called sequence")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("AB1 or SCF file"),
        )
        .arg(
            Arg::new("revcomp")
                .long("revcomp")
                .action(ArgAction::SetTrue)
                .help("Analyze the reverse complement of the read"),
        )
        .arg(
            Arg::new("orfs")
                .long("orfs")
                .action(ArgAction::SetTrue)
                .help("Find open reading frames"),
        )
        .arg(
            Arg::new("min-orf")
                .long("min-orf")
                .value_name("NT")
                .value_parser(value_parser!(usize))
                .help("Minimum ORF length in nucleotides, stop codon included (default: 300)"),
        )
        .arg(
            Arg::new("frames")
                .long("frames")
                .value_name("FRAMES")
                .value_delimiter(',')
                .allow_hyphen_values(true)
                .value_parser(value_parser!(ReadingFrame))
                .help("Reading frames to scan, e.g. +1,+2,-1 (default: all six)"),
        )
        .arg(
            Arg::new("enzymes")
                .long("enzymes")
                .action(ArgAction::SetTrue)
                .help("Find restriction sites from the built-in enzyme library"),
        )
        .arg(
            Arg::new("enzyme")
                .long("enzyme")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Only search for this enzyme; may be repeated. Implies --enzymes"),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .value_name("START-END")
                .value_parser(parse_region)
                .help("Print the bases in this 1-based, inclusive range"),
        )
        .arg(
            Arg::new("fasta")
                .long("fasta")
                .value_name("PATH")
                .num_args(0..=1)
                .default_missing_value("")
                .help("Write the base calls as FASTA (default path: next to the input)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the decoded read and results as JSON"),
        )
        .arg(
            Arg::new("quality-threshold")
                .long("quality-threshold")
                .value_name("Q")
                .value_parser(value_parser!(u8))
                .help("Bases below this quality are reported as low quality (default: 20)"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .help("Seed for quality values synthesized when an AB1 file has none"),
        )
        .arg(
            Arg::new("prefs")
                .long("prefs")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Load analysis preferences from this file"),
        )
        .arg(
            Arg::new("save-prefs")
                .long("save-prefs")
                .action(ArgAction::SetTrue)
                .help("Save the effective preferences (to --prefs, or the default file)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet")
                .help("Debug logging"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Only log errors"),
        )
}

fn parse_region(s: &str) -> Result<RangeIncl, String> {
    let (start, end) = s
        .split_once(['-', '.', ':'])
        .ok_or_else(|| format!("Expected START-END, got {s}"))?;
    let end = end.trim_start_matches('.');

    let start = start.trim().parse().map_err(|_| format!("Invalid start: {start}"))?;
    let end = end.trim().parse().map_err(|_| format!("Invalid end: {end}"))?;
    Ok(RangeIncl::new(start, end))
}

fn init_logging(matches: &ArgMatches) {
    let filter = if matches.get_flag("verbose") {
        EnvFilter::new("debug")
    } else if matches.get_flag("quiet") {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Stored preferences, with any command-line overrides applied.
fn effective_prefs(matches: &ArgMatches) -> anyhow::Result<AnalysisPrefs> {
    let mut prefs = match matches.get_one::<PathBuf>("prefs") {
        Some(path) if path.exists() => AnalysisPrefs::load_from_file(path)
            .with_context(|| format!("Failed to load preferences from {}", path.display()))?,
        _ => AnalysisPrefs::default(),
    };

    if let Some(&min) = matches.get_one::<usize>("min-orf") {
        prefs.min_orf_len = min;
    }
    if let Some(frames) = matches.get_many::<ReadingFrame>("frames") {
        prefs.frames = frames.copied().collect();
    }
    if let Some(&q) = matches.get_one::<u8>("quality-threshold") {
        prefs.quality_threshold = q;
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        prefs.quality_seed = seed;
    }
    if let Some(names) = matches.get_many::<String>("enzyme") {
        prefs.enzymes = names.cloned().collect();
    }

    Ok(prefs)
}

fn decode(path: &Path, prefs: &AnalysisPrefs) -> anyhow::Result<SequenceModel> {
    file_io::load(path, &prefs.decode_options()).map_err(|e| {
        if e.is_unsupported_format() {
            anyhow!(ZTR_MESSAGE)
        } else {
            anyhow::Error::new(e).context(format!("Failed to decode {}", path.display()))
        }
    })
}

fn print_summary(path: &Path, model: &SequenceModel, prefs: &AnalysisPrefs, revcomp: bool) {
    println!("File:          {}", path.display());
    println!("Format:        {}", model.file_format());
    println!("Bases:         {}", model.sequence_length());
    println!("Trace length:  {}", model.trace_len());
    println!("Mean quality:  {:.1}", model.mean_quality());
    println!(
        "Below Q{}:     {}",
        prefs.quality_threshold,
        model.low_quality_positions(prefs.quality_threshold).len()
    );
    if revcomp {
        println!("Strand:        reverse complement");
    }
    println!();
    println!("{}", model.sequence());
}

fn print_orfs(orfs: &[Orf], prefs: &AnalysisPrefs) {
    println!();
    println!("ORFs (>= {} nt): {}", prefs.min_orf_len, orfs.len());
    for orf in orfs {
        // 1-based for display.
        println!(
            "  {}  {}..{}  {} nt  {} aa  {}",
            orf.frame,
            orf.start + 1,
            orf.end + 1,
            orf.length_nt,
            orf.length_aa,
            orf.amino_acids
        );
    }
}

fn print_sites(sites: &[RestrictionSite], lib: &[RestrictionEnzyme]) {
    println!();
    println!("Restriction sites: {}", sites.len());
    for site in sites {
        let (depiction, ends) = match lib.iter().find(|re| re.name == site.enzyme_name) {
            Some(re) if re.makes_blunt_ends() => (re.cut_depiction(), "blunt"),
            Some(re) => (re.cut_depiction(), "sticky"),
            None => (String::new(), ""),
        };

        println!(
            "  {:<8} at {}  cut after {}  {}  ({depiction}) {ends}",
            site.enzyme_name,
            site.position + 1,
            site.cut_position,
            site.matched_text,
        );
    }

    let mut counts: Vec<(&str, usize)> = match_counts(sites).into_iter().collect();
    counts.sort();
    for (name, count) in counts {
        println!("  {name}: {count}");
    }
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(&matches);

    let prefs = effective_prefs(&matches)?;
    debug!("Preferences: {prefs:?}");

    if matches.get_flag("save-prefs") {
        let path = matches
            .get_one::<PathBuf>("prefs")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFS_FILE));
        prefs
            .save_to_file(&path)
            .with_context(|| format!("Failed to save preferences to {}", path.display()))?;
        info!("Saved preferences to {}", path.display());
    }

    // `required(true)` guarantees this.
    let Some(path) = matches.get_one::<PathBuf>("file") else {
        return Err(anyhow!("No input file"));
    };

    let mut model = decode(path, &prefs)?;

    let revcomp = matches.get_flag("revcomp");
    if revcomp {
        model = model.reverse_complement();
    }

    let orfs = matches
        .get_flag("orfs")
        .then(|| find_orfs(model.sequence(), &prefs.frames, prefs.min_orf_len));

    let lib = select_enzymes(&load_re_library(), &prefs.enzymes);
    let want_sites = matches.get_flag("enzymes") || matches.contains_id("enzyme");
    let sites = want_sites.then(|| find_restriction_sites(model.sequence(), &lib));

    if let Some(fasta) = matches.get_one::<String>("fasta") {
        let out = if fasta.is_empty() {
            file_io::fasta_path_for(path)
        } else {
            PathBuf::from(fasta)
        };
        export_fasta(&model, &file_io::fasta_header_for(path), &out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        info!("Wrote {}", out.display());
    }

    if matches.get_flag("json") {
        let report = Report {
            file: path.display().to_string(),
            reverse_complemented: revcomp,
            model: &model,
            mean_quality: model.mean_quality(),
            low_quality_positions: model.low_quality_positions(prefs.quality_threshold),
            orfs,
            restriction_sites: sites,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_summary(path, &model, &prefs, revcomp);
    if let Some(orfs) = &orfs {
        print_orfs(orfs, &prefs);
    }
    if let Some(sites) = &sites {
        print_sites(sites, &lib);
    }
    if let Some(&range) = matches.get_one::<RangeIncl>("region") {
        println!();
        match model.region(range) {
            Some(bases) => println!("Region {}..{}: {bases}", range.start, range.end),
            None => println!("Region {}..{} is outside the read", range.start, range.end),
        }
    }

    Ok(())
}
