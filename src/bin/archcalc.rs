// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! archcalc command-line entry point
//!
//! Drives every calculator from the terminal. Values not given on the
//! command line come from the TOML config file (see `archcalc::config`).

use archcalc::config::{CacheDefaults, CalcConfig};
use archcalc::core::address::{self, bit_string, Radix};
use archcalc::core::cache::{CacheConfig, CacheSimulator, MappingPolicy};
use archcalc::core::convert::{Interpretation, Word};
use archcalc::core::heap::{self, BlockHeader, HeaderFlags};
use archcalc::core::translate::TlbConfig;
use archcalc::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "archcalc",
    version,
    about = "Cache, heap header, address translation and base conversion calculators"
)]
struct Cli {
    /// Config file with default parameters (overrides ARCHCALC_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log each decision the calculators make
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split addresses into tag/index/offset and simulate hits and misses
    Cache(CacheArgs),

    /// Encode or decode heap block headers
    #[command(subcommand)]
    Header(HeaderCommand),

    /// Break a virtual address into VPN, TLB index, TLB tag and offset
    Translate(TranslateArgs),

    /// Convert a 32-bit value between decimal, binary and hex
    Convert(ConvertArgs),
}

#[derive(Args)]
struct CacheArgs {
    /// Address width in bits
    #[arg(short = 'b', long)]
    address_bits: Option<u32>,

    /// Block size in bytes
    #[arg(short = 'B', long)]
    block_size: Option<u64>,

    /// Number of sets
    #[arg(short, long, conflicts_with = "cache_size_kb")]
    sets: Option<u64>,

    /// Total cache size in KB (derives the number of sets)
    #[arg(short = 'k', long)]
    cache_size_kb: Option<u64>,

    /// Set associativity
    #[arg(short = 'a', long)]
    ways: Option<u32>,

    /// Use direct-mapped placement
    #[arg(short, long)]
    direct_mapped: bool,

    /// File with one hex address per line ('#' starts a comment)
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Emit the simulation records as JSON
    #[arg(long)]
    json: bool,

    /// Hex addresses to reference, in order
    addresses: Vec<String>,
}

#[derive(Subcommand)]
enum HeaderCommand {
    /// Build a header word from a block or malloc size
    Encode(EncodeArgs),

    /// Decode a header word given in hex
    Decode {
        /// Header word (hex, optional 0x)
        value: String,

        /// Row width used to count how many rows the block spans
        #[arg(short = 'r', long)]
        bits_per_row: Option<u32>,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("size").required(true).args(["block_size", "malloc_size"])))]
struct EncodeArgs {
    /// Block size in bytes, header and footer included
    #[arg(short = 'B', long)]
    block_size: Option<u64>,

    /// Payload size requested from malloc
    #[arg(short, long)]
    malloc_size: Option<u64>,

    /// Mark the block allocated
    #[arg(short, long)]
    allocated: bool,

    /// Mark the previous block allocated
    #[arg(short, long)]
    prev_allocated: bool,

    /// Row width used to count how many rows the block spans
    #[arg(short = 'r', long)]
    bits_per_row: Option<u32>,
}

#[derive(Args)]
struct TranslateArgs {
    /// Virtual address width in bits
    #[arg(short = 'w', long)]
    va_width: Option<u32>,

    /// Page size in bytes
    #[arg(short, long)]
    page_size: Option<u64>,

    /// Number of TLB sets
    #[arg(short = 's', long)]
    tlb_sets: Option<u64>,

    /// TLB ways
    #[arg(short = 'a', long)]
    tlb_ways: Option<u32>,

    /// Radix of the address
    #[arg(short, long, value_enum)]
    radix: Option<Radix>,

    /// Virtual address
    address: String,
}

#[derive(Args)]
struct ConvertArgs {
    /// Radix of the input value
    #[arg(short, long, value_enum, default_value = "decimal")]
    from: Radix,

    /// Interpret the value as 32-bit two's complement
    #[arg(short, long, conflicts_with = "unsigned")]
    twos_complement: bool,

    /// Interpret the value as unsigned, even if the config says otherwise
    #[arg(short, long)]
    unsigned: bool,

    /// Value to convert
    #[arg(allow_hyphen_values = true)]
    value: String,
}

fn main() -> ExitCode {
    // Load .env before reading ARCHCALC_CONFIG
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let result = load_config(cli.config.as_deref(), &CalcConfig::path_from_env()).and_then(
        |config| match cli.command {
            Command::Cache(args) => run_cache(args, &config),
            Command::Header(command) => run_header(command, &config),
            Command::Translate(args) => run_translate(args, &config),
            Command::Convert(args) => run_convert(args, &config),
        },
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// An explicitly requested config file must load; the implicit one may be absent
fn load_config(explicit: Option<&Path>, implicit: &Path) -> Result<CalcConfig> {
    match explicit {
        Some(path) => CalcConfig::load(path),
        None => Ok(CalcConfig::load_or_default(implicit)),
    }
}

/// Merge command-line geometry over the config defaults
///
/// `--sets` wins over any capacity; otherwise the capacity from the
/// command line or the config derives the set count.
fn cache_config(args: &CacheArgs, defaults: &CacheDefaults) -> Result<CacheConfig> {
    let policy = if args.direct_mapped {
        MappingPolicy::DirectMapped
    } else {
        defaults.policy
    };
    let address_bits = args.address_bits.unwrap_or(defaults.address_bits);
    let block_size = args.block_size.unwrap_or(defaults.block_size_bytes);
    let ways = args.ways.unwrap_or(defaults.associativity);

    let config = match args.sets {
        Some(num_sets) => CacheConfig {
            address_bits,
            block_size_bytes: block_size,
            num_sets,
            associativity: ways,
            policy,
        },
        None => CacheConfig::from_capacity(
            address_bits,
            args.cache_size_kb.unwrap_or(defaults.cache_size_kb),
            block_size,
            ways,
            policy,
        )?,
    };
    Ok(config)
}

fn run_cache(args: CacheArgs, config: &CalcConfig) -> Result<()> {
    let cache_config = cache_config(&args, &config.cache)?;

    let mut sim = CacheSimulator::new();
    let bits = sim.configure(cache_config)?;
    let geometry = cache_config.geometry();

    let mut addresses = args.addresses;
    if let Some(path) = &args.trace {
        addresses.extend(read_trace(path)?);
    }
    for address in &addresses {
        sim.reference_str(address)?;
    }

    if args.json {
        let json = serde_json::json!({
            "config": cache_config,
            "bits": bits,
            "geometry": geometry,
            "records": sim.records(),
            "summary": sim.summary(),
        });
        let text = serde_json::to_string_pretty(&json).map_err(std::io::Error::from)?;
        println!("{}", text);
        return Ok(());
    }

    println!(
        "{} sets x {} ways x {} B blocks ({} blocks, {} B)",
        geometry.total_sets,
        cache_config.ways(),
        cache_config.block_size_bytes,
        geometry.total_blocks,
        geometry.capacity_bytes
    );
    println!("Block offset bits: {}", bits.offset_bits);
    println!("Set index bits:    {}", bits.index_bits);
    println!("Tag bits:          {}", bits.tag_bits);

    if sim.records().is_empty() {
        return Ok(());
    }

    println!();
    println!(
        "{:<20} {:<12} {:<10} {:<10} {:<6} State of tags",
        "Reference", "Tag", "Set", "Offset", "Result"
    );
    for record in sim.records() {
        println!(
            "{:<20} {:<12} {:<10} {:<10} {:<6} {}",
            format!("0x{:x}", record.raw_address),
            format!("0x{:x}", record.tag),
            format!("0x{:x}", record.set_index),
            format!("0x{:x}", record.block_offset),
            record.outcome(),
            record.tag_state_hex()
        );
    }

    let summary = sim.summary();
    println!();
    println!(
        "{} references, {} hits, {} misses (hit rate {:.1}%)",
        summary.references,
        summary.hits,
        summary.misses,
        summary.hit_rate() * 100.0
    );
    Ok(())
}

/// Addresses in a trace, skipping blank lines and `#` comments
fn parse_trace(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_trace(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    let addresses = parse_trace(&contents);
    log::debug!("Read {} addresses from {}", addresses.len(), path.display());
    Ok(addresses)
}

/// Header to report and the row width to count it in
fn resolve_header(command: HeaderCommand, config: &CalcConfig) -> Result<(BlockHeader, u32)> {
    let (header, bits_per_row) = match command {
        HeaderCommand::Encode(args) => {
            let block_size = match (args.block_size, args.malloc_size) {
                (Some(size), _) => size,
                (None, Some(payload)) => heap::block_size_for_payload(payload)?,
                // clap's argument group guarantees one of the two
                (None, None) => unreachable!("size group is required"),
            };
            let mut flags = HeaderFlags::empty();
            flags.set(HeaderFlags::ALLOCATED, args.allocated);
            flags.set(HeaderFlags::PREV_ALLOCATED, args.prev_allocated);
            (BlockHeader::new(block_size, flags)?, args.bits_per_row)
        }
        HeaderCommand::Decode {
            value,
            bits_per_row,
        } => {
            let word = address::parse_hex(&value, 64)?;
            (BlockHeader::decode(word), bits_per_row)
        }
    };
    Ok((header, bits_per_row.unwrap_or(config.heap.bits_per_row)))
}

/// Report lines for a header; fails before producing any line
fn header_report(header: &BlockHeader, bits_per_row: u32) -> Result<Vec<String>> {
    let rows = header.rows(bits_per_row)?;

    let word = header.encode();
    let width = (u64::BITS - word.leading_zeros())
        .max(bits_per_row)
        .clamp(8, u64::BITS);
    let payload = match header.payload_size() {
        Ok(payload) => format!("{} bytes", payload),
        Err(e) => format!("n/a ({})", e),
    };

    Ok(vec![
        format!("Header:          0x{:x}", word),
        format!("Bits:            {}", bit_string(word, width)),
        format!("Block size:      {} bytes", header.size()),
        format!("Malloc size:     {}", payload),
        format!("Allocated:       {}", header.is_allocated()),
        format!("Prev allocated:  {}", header.is_prev_allocated()),
        format!("Rows ({:>2} bits): {}", bits_per_row, rows),
    ])
}

fn run_header(command: HeaderCommand, config: &CalcConfig) -> Result<()> {
    let (header, bits_per_row) = resolve_header(command, config)?;
    for line in header_report(&header, bits_per_row)? {
        println!("{}", line);
    }
    Ok(())
}

fn run_translate(args: TranslateArgs, config: &CalcConfig) -> Result<()> {
    let defaults = &config.tlb;
    let tlb = TlbConfig {
        virtual_address_width: args.va_width.unwrap_or(defaults.virtual_address_width),
        page_size: args.page_size.unwrap_or(defaults.page_size),
        tlb_sets: args.tlb_sets.unwrap_or(defaults.tlb_sets),
        tlb_ways: args.tlb_ways.unwrap_or(defaults.tlb_ways),
    };
    let radix = args.radix.unwrap_or(defaults.address_radix);

    let geometry = tlb.geometry()?;
    let t = tlb.translate_str(&args.address, radix)?;

    println!(
        "Address:    {}",
        bit_string(t.address, tlb.virtual_address_width)
    );
    println!(
        "Fields:     tag {} bits | index {} bits | offset {} bits",
        geometry.tag_bits, geometry.index_bits, geometry.offset_bits
    );
    println!("VPN:        {} (0x{:X})", t.vpn, t.vpn);
    println!("TLB index:  {}", t.tlb_index);
    println!("TLB tag:    0x{:02X}", t.tlb_tag);
    println!("Offset:     {}", t.offset);
    Ok(())
}

/// Flags override the configured interpretation in either direction
fn interpretation(args: &ConvertArgs, config: &CalcConfig) -> Interpretation {
    if args.twos_complement {
        Interpretation::TwosComplement
    } else if args.unsigned {
        Interpretation::Unsigned
    } else {
        config.convert.interpretation
    }
}

fn run_convert(args: ConvertArgs, config: &CalcConfig) -> Result<()> {
    let word = Word::parse(&args.value, args.from, interpretation(&args, config))?;

    println!("Decimal:     {}", word.decimal());
    println!("Binary:      {}", word.binary());
    println!("Hexadecimal: {}", word.hex());
    Ok(())
}
