use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use crossterm::style::{Color, Stylize};
use dots_lock::{
    scramble, solve_with, verify_with, LockError, Operator, SearchLimits, Solution, SolverConfig,
    State,
};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::time::Duration;

// Suppose each number represents a colour in the slot, read clockwise from 12 o'clock:
// 0 for no colour, 1 for yellow, 2 for blue, 3 for red and so on up to 8.
const PALETTE: [Color; 9] = [
    Color::DarkGrey,
    Color::Yellow,
    Color::Blue,
    Color::Red,
    Color::Green,
    Color::Magenta,
    Color::Cyan,
    Color::White,
    Color::DarkYellow,
];

#[derive(Parser, Debug)]
#[command(
    name = "dots-lock-cracker",
    version,
    about = "Finds the shortest L2/R2/X sequence that turns one lock pattern into another",
    after_help = "Example: dots-lock-cracker 30000013 03100030",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    solve: SolveArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve one pair of patterns
    Solve(SolveArgs),
    /// Read pairs of patterns from stdin, one per line
    Interactive(SearchOptions),
    /// Cross-check the breadth-first and depth-first solvers on random scrambles
    Selftest(SelftestArgs),
}

#[derive(Args, Debug, Clone)]
struct SolveArgs {
    /// Original pattern, e.g. 30000013
    original: Option<String>,

    /// Target pattern, e.g. 03100030
    target: Option<String>,

    #[command(flatten)]
    options: SearchOptions,
}

#[derive(Args, Debug, Clone, Default)]
struct SearchOptions {
    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Confirm the distance with the depth-first solver
    #[arg(long)]
    verify: bool,

    /// Give up after dequeuing this many states
    #[arg(long)]
    max_states: Option<usize>,

    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print states without colour
    #[arg(long)]
    no_color: bool,
}

impl SearchOptions {
    /// Limits start counting from the moment this is called.
    fn config(&self) -> SolverConfig {
        let mut limits = SearchLimits::unlimited();
        if let Some(max) = self.max_states {
            limits = limits.with_max_states(max);
        }
        if let Some(ms) = self.timeout_ms {
            limits = limits.with_timeout(Duration::from_millis(ms));
        }
        SolverConfig::new(limits)
    }
}

#[derive(Args, Debug, Clone)]
struct SelftestArgs {
    /// Number of random cases
    #[arg(long, default_value_t = 10)]
    cases: usize,

    /// Upper bound on scramble length
    #[arg(long, default_value_t = 50)]
    max_moves: usize,

    /// RNG seed, random when omitted
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct Report<'a> {
    total_steps: usize,
    states: Vec<&'a State>,
    operators: Vec<Operator>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_micros()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Solve(args)) => run_solve(&args),
        Some(Command::Interactive(options)) => run_interactive(&options),
        Some(Command::Selftest(args)) => run_selftest(&args),
        None => run_solve(&cli.solve),
    }
}

const USAGE: &str = "Usage: dots-lock-cracker [original pattern] [target pattern]\n\
                     Example: dots-lock-cracker 30000013 03100030";

fn invalid_arguments(reason: &str) -> anyhow::Error {
    anyhow!("Invalid arguments: {}.\n{}", reason, USAGE)
}

/// Missing and malformed patterns fail the same way.
fn parse_patterns(args: &SolveArgs) -> anyhow::Result<(State, State)> {
    let (Some(original), Some(target)) = (args.original.as_deref(), args.target.as_deref()) else {
        return Err(invalid_arguments("expected an original and a target pattern"));
    };
    let parse = |text: &str| {
        text.parse::<State>()
            .map_err(|e| invalid_arguments(&format!("'{}': {}", text, e)))
    };
    Ok((parse(original)?, parse(target)?))
}

fn run_solve(args: &SolveArgs) -> anyhow::Result<()> {
    let (original, target) = parse_patterns(args)?;

    let solution = solve_pair(original, target, &args.options)
        .context("No solution found, please check your input.")?;

    let mut stdout = io::stdout().lock();
    print_solution(&mut stdout, &solution, &args.options)?;
    Ok(())
}

fn solve_pair(original: State, target: State, options: &SearchOptions) -> anyhow::Result<Solution> {
    let config = options.config();
    let solution = solve_with(original, target, &config)?;

    if options.verify {
        cross_check(original, target, &solution, options.config())?;
        info!("depth-first solver agrees on {} steps", solution.distance);
    }

    Ok(solution)
}

/// Reruns the pair depth-first, bounded by the breadth-first distance.
///
/// A shorter path or none within the bound both show up as a mismatch.
fn cross_check(
    original: State,
    target: State,
    bfs: &Solution,
    config: SolverConfig,
) -> anyhow::Result<()> {
    let config = config.with_dfs_depth_bound(bfs.distance);
    let dfs = verify_with(original, target, &config)?;
    if dfs != Some(bfs.distance) {
        bail!("solvers disagree: BFS={}, DFS={:?}", bfs.distance, dfs);
    }
    Ok(())
}

fn print_solution<W: Write>(
    out: &mut W,
    solution: &Solution,
    options: &SearchOptions,
) -> io::Result<()> {
    if options.json {
        let report = Report {
            total_steps: solution.distance,
            states: solution.states().collect(),
            operators: solution.operators().collect(),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        return writeln!(out, "{}", json);
    }

    writeln!(out, "Total steps: {}", solution.distance)?;
    writeln!(out)?;
    for state in solution.states() {
        writeln!(out, "{}", render_state(state, !options.no_color))?;
    }
    writeln!(out)?;

    let ops: Vec<String> = solution.operators().map(|op| op.to_string()).collect();
    writeln!(out, "{}", ops.join(" "))
}

fn render_state(state: &State, color: bool) -> String {
    if !color {
        return state.to_string();
    }
    state
        .slots()
        .iter()
        .map(|&value| {
            value
                .to_string()
                .with(PALETTE[value as usize])
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn compact(state: &State) -> String {
    state.slots().iter().map(|v| v.to_string()).collect()
}

fn run_interactive(options: &SearchOptions) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut stdout = io::stdout().lock();

    loop {
        write!(stdout, "original> ")?;
        stdout.flush()?;
        let Some(original) = next_pattern(&mut lines)? else {
            break;
        };

        write!(stdout, "target> ")?;
        stdout.flush()?;
        let Some(target) = next_pattern(&mut lines)? else {
            break;
        };

        let (original, target) = match (original, target) {
            (Ok(original), Ok(target)) => (original, target),
            (Err(e), _) | (_, Err(e)) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match solve_pair(original, target, options) {
            Ok(solution) => print_solution(&mut stdout, &solution, options)?,
            Err(e) => match e.downcast_ref::<LockError>() {
                Some(LockError::NoSolution) => {
                    eprintln!("No solution found, please check your input.")
                }
                _ => eprintln!("{:#}", e),
            },
        }
        writeln!(stdout)?;
    }

    Ok(())
}

/// `None` on EOF or a blank line.
fn next_pattern<B: BufRead>(
    lines: &mut io::Lines<B>,
) -> anyhow::Result<Option<Result<State, LockError>>> {
    let Some(line) = lines.next() else {
        return Ok(None);
    };
    let line = line.context("failed to read from stdin")?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(line.parse::<State>()))
}

fn run_selftest(args: &SelftestArgs) -> anyhow::Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("selftest seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    for case in 1..=args.cases {
        // Scrambling a known pattern keeps every case solvable.
        let original = State::identity();
        let moves = rng.gen_range(0..=args.max_moves);
        let target = scramble(&mut rng, original, moves);

        println!("Test {}:", case);
        println!("Orig: {}", compact(&original));
        println!("Tgt : {}", compact(&target));

        let config = SolverConfig::default();
        let bfs = solve_with(original, target, &config)
            .with_context(|| format!("breadth-first solver failed in case {}", case))?;
        println!("Min steps = {}", bfs.distance);

        cross_check(original, target, &bfs, config)
            .with_context(|| format!("Mismatch in case {} (seed {})", case, seed))?;
        if let Err(reason) = bfs.validate(&original, &target) {
            bail!("Invalid path in case {}: {}", case, reason);
        }
    }

    println!("All {} random tests passed!", args.cases);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn plain() -> SearchOptions {
        SearchOptions {
            no_color: true,
            ..SearchOptions::default()
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    fn solve_args(argv: &[&str]) -> SolveArgs {
        let mut full = vec!["dots-lock-cracker"];
        full.extend_from_slice(argv);
        Cli::try_parse_from(full).unwrap().solve
    }

    #[test]
    fn test_bare_patterns_parse() {
        let args = solve_args(&["30000013", "03100030"]);
        let (original, target) = parse_patterns(&args).unwrap();
        assert_eq!(original, "30000013".parse().unwrap());
        assert_eq!(target, "03100030".parse().unwrap());
    }

    #[test]
    fn test_bad_and_missing_patterns_fail_alike() {
        let cases: [&[&str]; 5] = [
            &["3000001", "03100030"],
            &["30000013", "30000019"],
            &["3000001a", "03100030"],
            &["30000013"],
            &[],
        ];
        for argv in cases {
            // Pattern errors reach our own handler, not clap's.
            let args = solve_args(argv);
            let err = parse_patterns(&args).unwrap_err().to_string();
            assert!(err.starts_with("Invalid arguments"), "{:?}: {}", argv, err);
            assert!(err.contains(USAGE), "{:?}: {}", argv, err);
        }
    }

    #[test]
    fn test_cross_check_bounds_dfs_by_bfs_distance() {
        let mut rng = StdRng::seed_from_u64(31);
        let original = State::identity();
        for _ in 0..5 {
            let target = scramble(&mut rng, original, 10);
            let bfs = solve_with(original, target, &SolverConfig::default()).unwrap();
            cross_check(original, target, &bfs, SolverConfig::default()).unwrap();

            if bfs.distance > 0 {
                let mut short = bfs.clone();
                short.distance -= 1;
                assert!(cross_check(original, target, &short, SolverConfig::default()).is_err());
            }
        }
    }

    #[test]
    fn test_selftest_defaults() {
        let cli = Cli::try_parse_from(["dots-lock-cracker", "selftest"]).unwrap();
        match cli.command {
            Some(Command::Selftest(args)) => {
                assert_eq!(args.cases, 10);
                assert_eq!(args.max_moves, 50);
                assert_eq!(args.seed, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_plain_output() {
        let original: State = "30000013".parse().unwrap();
        let target = Operator::L2.apply(&original);
        let solution = solve_pair(original, target, &plain()).unwrap();

        let mut out = Vec::new();
        print_solution(&mut out, &solution, &plain()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "Total steps: 1\n\n3 0 0 0 0 0 1 3\n0 0 0 0 1 3 3 0\n\nL2\n"
        );
    }

    #[test]
    fn test_json_output() {
        let original: State = "30000013".parse().unwrap();
        let target: State = "03100030".parse().unwrap();
        let options = SearchOptions {
            json: true,
            verify: true,
            ..plain()
        };
        let solution = solve_pair(original, target, &options).unwrap();

        let mut out = Vec::new();
        print_solution(&mut out, &solution, &options).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["total_steps"], solution.distance);
        assert_eq!(value["states"][0], serde_json::json!([3, 0, 0, 0, 0, 0, 1, 3]));
        assert_eq!(
            value["operators"].as_array().unwrap().len(),
            solution.distance
        );
    }

    #[test]
    fn test_no_solution_surfaces_lock_error() {
        let original: State = "00000000".parse().unwrap();
        let target: State = "10000000".parse().unwrap();
        let err = solve_pair(original, target, &plain()).unwrap_err();
        assert_eq!(err.downcast_ref::<LockError>(), Some(&LockError::NoSolution));
    }

    #[test]
    fn test_next_pattern_stops_on_blank() {
        let input = io::Cursor::new("30000013\n\n03100030\n");
        let mut lines = input.lines();
        assert!(matches!(next_pattern(&mut lines).unwrap(), Some(Ok(_))));
        assert!(next_pattern(&mut lines).unwrap().is_none());
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact(&State::identity()), "01234567");
    }
}
