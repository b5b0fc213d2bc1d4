//! Print the dense expansion of a matrix file

use anyhow::Result;

use iga_assembler::io::matrixio::read_matrix;

fn print_help(program: &str) {
    println!(
        "\n{program} mat

  mat       name of the matrix file to echo to the console; use \"stdin\"
            to read from the console."
    );
}

fn run(name: &str) -> Result<()> {
    let matrix = read_matrix(name)?;
    let dense = matrix.to_dense();
    for r in 0..dense.nrows() {
        let row: Vec<String> = (0..dense.ncols())
            .map(|c| format!("{:>12.6}", dense[(r, c)]))
            .collect();
        println!("{}", row.join(" "));
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let argv: Vec<String> = std::env::args().collect();
    if argv.len() != 2 {
        if argv.len() < 2 {
            println!("\nThe following error occurred: input missing.");
        } else {
            println!("\nThe following error occurred: too much input.");
        }
        print_help(&argv[0]);
        std::process::exit(1);
    }
    if let Err(e) = run(&argv[1]) {
        println!("There was a problem in reading the file: {e}");
        std::process::exit(3);
    }
}
