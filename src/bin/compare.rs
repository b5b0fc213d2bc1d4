//! Compare two matrix files by Frobenius distance

use iga_assembler::algebra::frobenius_distance;
use iga_assembler::io::matrixio::read_matrix;

const TOLERANCE: f64 = 1e-7;

fn print_help(program: &str) {
    println!(
        "\n{program} mat1 mat2

  mat1 mat2    names of the matrix files to compare."
    );
}

fn main() {
    env_logger::init();
    let argv: Vec<String> = std::env::args().collect();
    if argv.len() != 3 {
        if argv.len() < 3 {
            println!("\nThe following error occurred: input missing.");
        } else {
            println!("\nThe following error occurred: too much input.");
        }
        print_help(&argv[0]);
        std::process::exit(1);
    }

    let mut matrices = Vec::with_capacity(2);
    for (i, name) in argv[1..3].iter().enumerate() {
        match read_matrix(name) {
            Ok(m) => matrices.push(m),
            Err(e) => {
                println!(
                    "There was a problem in reading the {} file: {e}",
                    if i == 0 { "first" } else { "second" }
                );
                std::process::exit(3);
            }
        }
    }

    if matrices[0].rows != matrices[1].rows
        || matrices[0].cols != matrices[1].cols
        || !matrices[0].valid()
    {
        println!(
            "The sizes of the matrices do not agree: {}x{} vs. {}x{}",
            matrices[0].rows, matrices[0].cols, matrices[1].rows, matrices[1].cols
        );
        std::process::exit(1);
    }

    let err = frobenius_distance(&matrices[0].to_csr(), &matrices[1].to_csr());
    println!("{err}");
    std::process::exit(if err < TOLERANCE { 0 } else { 1 });
}
