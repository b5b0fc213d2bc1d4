//! Assemble a problem file and write the resulting matrix

use std::io::Read;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};

use iga_assembler::assemble::{assemble_parallel, SecondOrderModel};
use iga_assembler::io::matrixio::{write_matrix, MatrixData};
use iga_assembler::io::Problem;
use iga_assembler::prelude::recommended_quadrature;
use iga_assembler::tools::timing::{
    process_cpu_time, seconds, TIME_ADD_MACRO, TIME_ASSEMBLE, TIME_COMPUTE_STRUCTURE,
    TIME_EVAL_BASES, TIME_EVAL_COEF, TIME_GEO_COMPUTE, TIME_GEO_TRANSFORM, TIME_MACRO_SETUP,
};

fn print_help(program: &str) {
    println!(
        "\n{program} test_file [-o file] [-l file] [-m method] [-threads num]

  test_file      the problem file (as created with generate); use \"stdin\"
                 to read from the console.
  -o file        write the matrix into this file; use \"stdout\" to write
                 to the console.
  -l file        append a tab-separated timing row to this log file.
  -m method      one of
                    global     global sum factorization (default)
                    element    element-wise; same as -m macro 1 ... 1
                    macroS     macros sized by the degree; same as
                               -m macro p[1] ... p[d]
                    macroN     same as -m macro p[1] ... p[d-1] 1
                    macroR     same as -m macro 1 p[2] ... p[d]
                    macro s1 ... sd
                               macros of the given sizes; -1 is replaced
                               by the spline degree of that direction.
  -threads num   use num threads (default 1); macro methods only."
    );
}

struct RunArgs {
    problem_file: String,
    problem_text: String,
    method: String,
    sizes: Vec<i64>,
    threads: usize,
    output: Option<String>,
    log: Option<String>,
}

fn parse_args(args: &[String]) -> Result<RunArgs> {
    let mut it = args.iter();
    let problem_file = it
        .next()
        .ok_or_else(|| anyhow!("no test file is given"))?
        .clone();

    let problem_text = if problem_file == "stdin" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(&problem_file)?
    };

    let mut r = RunArgs {
        problem_file,
        problem_text,
        method: "global".into(),
        sizes: Vec::new(),
        threads: 1,
        output: None,
        log: None,
    };

    let mut have_o = false;
    let mut have_l = false;
    let mut have_m = false;
    let mut have_t = false;
    let mut pending: Vec<String> = it.cloned().collect();
    pending.reverse();

    while let Some(flag) = pending.pop() {
        match flag.to_ascii_lowercase().as_str() {
            "-o" => {
                if have_o {
                    bail!("cannot give -o twice");
                }
                r.output = Some(pending.pop().ok_or_else(|| anyhow!("-o needs a file"))?);
                have_o = true;
            }
            "-l" => {
                if have_l {
                    bail!("cannot give -l twice");
                }
                r.log = Some(pending.pop().ok_or_else(|| anyhow!("-l needs a file"))?);
                have_l = true;
            }
            "-m" => {
                if have_m {
                    bail!("cannot give -m twice");
                }
                let mut method = pending.pop().ok_or_else(|| anyhow!("-m needs a method"))?;
                if method == "macro" {
                    while let Some(next) = pending.last() {
                        match next.parse::<i64>() {
                            Ok(sz) => {
                                r.sizes.push(sz);
                                pending.pop();
                            }
                            Err(_) => break,
                        }
                    }
                    if r.sizes.is_empty() {
                        bail!("-m macro requires sizes to be given");
                    }
                    for sz in &r.sizes {
                        method += &format!(":{sz}");
                    }
                } else if !matches!(
                    method.as_str(),
                    "global" | "element" | "macroS" | "macroN" | "macroR"
                ) {
                    bail!("unknown method \"{method}\"");
                }
                r.method = method;
                have_m = true;
            }
            "-threads" => {
                if have_t {
                    bail!("cannot give -threads twice");
                }
                let v: i64 = pending
                    .pop()
                    .ok_or_else(|| anyhow!("-threads needs a number"))?
                    .parse()
                    .map_err(|_| anyhow!("-threads needs an integer"))?;
                if v < 1 {
                    bail!("need at least 1 thread");
                }
                r.threads = v as usize;
                have_t = true;
            }
            other => bail!("unknown option \"{other}\""),
        }
    }

    if r.threads > 1 && r.method == "global" {
        bail!("the parallel implementation is only available for macro methods");
    }
    Ok(r)
}

fn macro_sizes(method: &str, explicit: &[i64], dim: usize) -> Vec<i64> {
    match method {
        "element" => vec![1; dim],
        "macroS" => vec![-1; dim],
        "macroN" => {
            let mut s = vec![-1; dim];
            s[dim - 1] = 1;
            s
        }
        "macroR" => {
            let mut s = vec![-1; dim];
            s[0] = 1;
            s
        }
        _ => explicit.to_vec(),
    }
}

fn run(args: &[String]) -> Result<()> {
    let args = parse_args(args)?;
    let quiet = args.output.as_deref() == Some("stdout");

    let problem = Problem::from_json(&args.problem_text)?;
    let model = SecondOrderModel::new(problem.eq.clone(), problem.geometry.clone())?;

    let real_start = Instant::now();
    let cpus_start = process_cpu_time();
    let res = if args.method == "global" {
        let quad = recommended_quadrature(&problem.test, &problem.trial);
        model.assemble(&problem.test, &problem.trial, &quad)?
    } else {
        let sizes = macro_sizes(&args.method, &args.sizes, problem.test.domain_dim());
        assemble_parallel(&model, &problem.test, &problem.trial, args.threads, &sizes)?
    };
    let real_time = real_start.elapsed().as_secs_f32();
    let cpus_time = (process_cpu_time() - cpus_start) as f32;

    if !quiet {
        println!(
            "Have assembled the corresponding {}x{} Galerkin matrix using \
             sum factorization ({}).",
            res.rows(),
            res.cols(),
            args.method
        );
        println!("Time:");
        println!("    kron-struct: {}s", seconds(&TIME_COMPUTE_STRUCTURE));
        println!("    bases-eval:  {}s", seconds(&TIME_EVAL_BASES));
        println!("    coefs-eval:  {}s", seconds(&TIME_EVAL_COEF));
        println!("     -geo-eval:  {}s", seconds(&TIME_GEO_COMPUTE));
        println!("     -geo-tran:  {}s", seconds(&TIME_GEO_TRANSFORM));
        println!("    assemble:    {}s", seconds(&TIME_ASSEMBLE));
        println!("    macro-setup: {}s", seconds(&TIME_MACRO_SETUP));
        println!("    macro-add:   {}s", seconds(&TIME_ADD_MACRO));
        println!();
        println!("Total time:      {real_time}s (real)");
        println!("                 {cpus_time}s (cpus)");
    }

    if let Some(output) = &args.output {
        if !quiet {
            println!("The assembled matrix is written to {output}.");
        }
        write_matrix(&MatrixData::from(&res), output)?;
    }

    if let Some(log) = &args.log {
        if !quiet {
            println!("Log data is written to {log}.");
        }
        let exists = std::path::Path::new(log).exists();
        let mut fs = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)?;
        use std::io::Write;
        if !exists {
            writeln!(
                fs,
                "TestName\tMethod\tTotalClockTime\tTotalCpuTime\tPartialSparsity\t\
                 PartialBases\tPartialCoefficients\tPartialGeometry\t\
                 PartialTransformation\tPartialSumFactorization\t\
                 PartialMacroElementSetup\tPartialMacroElementMerge"
            )?;
        }
        writeln!(
            fs,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            args.problem_file,
            args.method,
            real_time,
            cpus_time,
            seconds(&TIME_COMPUTE_STRUCTURE),
            seconds(&TIME_EVAL_BASES),
            seconds(&TIME_EVAL_COEF),
            seconds(&TIME_GEO_COMPUTE),
            seconds(&TIME_GEO_TRANSFORM),
            seconds(&TIME_ASSEMBLE),
            seconds(&TIME_MACRO_SETUP),
            seconds(&TIME_ADD_MACRO),
        )?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let argv: Vec<String> = std::env::args().collect();
    if let Err(e) = run(&argv[1..]) {
        println!("\nThe following error occurred: {e}");
        print_help(&argv[0]);
        std::process::exit(1);
    }
}
