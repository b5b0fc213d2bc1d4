//! Problem-description generator
//!
//! Emits a JSON test file for the assembler to standard output: geometry,
//! test and trial spaces, a matched Gauss quadrature and the PDE
//! coefficients.

use anyhow::{anyhow, bail, Context, Result};
use nalgebra::DVector;

use iga_assembler::algebra::Mat;
use iga_assembler::bases::{Bspline, TensorBasis};
use iga_assembler::geometry::{BasisCoefficientMap, GeoMap};
use iga_assembler::io::problem::{
    BasisDef, EqCoefsDef, GeoMapDef, ProblemDef, QuadratureDef,
};
use iga_assembler::prelude::{recommended_quadrature, EqCoef};

fn print_help(program: &str) {
    println!(
        "\n{program} [-geo name] [-dim dimension] [-d degree] [-n elements]
          [-s smoothness] [-A coefs] [-b coefs] [-c coef]

Generates a problem description file and writes it to the standard
output. The parameters are optional and can be given in any order.

  -geo name      name of a domain geometry from geometries.json
  -dim dimension use the unit hypercube of that dimension
Either -geo or -dim must be given.

  -d degree      polynomial degree of test and trial spaces; defaults to 1
  -n elements    number of elements per direction; defaults to 1
  -s smoothness  smoothness of test and trial spaces; defaults to degree-1
Different values per direction are possible with -dd, -nn and -ss; these
require -geo or -dim to be given before.

The assembling procedure assembles for the problem
  grad(u) A grad(w) + b.grad(u) w + c u w = f w
The A, b and c options must follow -geo or -dim:
  -A coefs       dim^2 numbers in row-major order, or ID for the identity;
                 defaults to 0 ... 0
  -b coefs       dim numbers; defaults to 0 ... 0
  -c coef        one number; defaults to 1"
    );
}

struct Options {
    a: Option<Mat>,
    b: Option<DVector<f64>>,
    c: f64,
    s: Vec<i64>,
    d: Vec<usize>,
    n: Vec<usize>,
    dim: usize,
    geo: Option<GeoMapDef>,
}

fn to_int(arg: Option<&String>) -> Result<i64> {
    let arg = arg.ok_or_else(|| anyhow!("reached end; expected an integer"))?;
    arg.parse()
        .map_err(|_| anyhow!("\"{arg}\" cannot be interpreted as an integer"))
}

fn to_double(arg: Option<&String>) -> Result<f64> {
    let arg = arg.ok_or_else(|| anyhow!("reached end; expected a number"))?;
    arg.parse()
        .map_err(|_| anyhow!("\"{arg}\" cannot be interpreted as a number"))
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut have_a = false;
    let mut have_b = false;
    let mut have_c = false;
    let mut have_dim = false;
    let mut have_deg = false;
    let mut have_ele = false;
    let mut have_reg = false;
    let mut single_deg = true;
    let mut single_ele = true;
    let mut single_reg = true;

    let mut d = 1usize;
    let mut n = 1usize;
    let mut s = i64::MAX;

    let mut opt = Options {
        a: None,
        b: None,
        c: 1.0,
        s: Vec::new(),
        d: Vec::new(),
        n: Vec::new(),
        dim: 2,
        geo: None,
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].to_ascii_lowercase();
        match flag.as_str() {
            "-a" => {
                if have_a {
                    bail!("cannot give -A twice");
                }
                if !have_dim {
                    bail!("domain must be known before -A");
                }
                i += 1;
                let mut a = Mat::zeros(opt.dim, opt.dim);
                if args
                    .get(i)
                    .map_or(false, |v| v.eq_ignore_ascii_case("id"))
                {
                    a.fill_with_identity();
                    i += 1;
                } else {
                    for r in 0..opt.dim {
                        for c in 0..opt.dim {
                            a[(r, c)] = to_double(args.get(i))?;
                            i += 1;
                        }
                    }
                }
                opt.a = Some(a);
                have_a = true;
            }
            "-b" => {
                if have_b {
                    bail!("cannot give -b twice");
                }
                if !have_dim {
                    bail!("domain must be known before -b");
                }
                i += 1;
                let mut b = DVector::zeros(opt.dim);
                for r in 0..opt.dim {
                    b[r] = to_double(args.get(i))?;
                    i += 1;
                }
                opt.b = Some(b);
                have_b = true;
            }
            "-c" => {
                if have_c {
                    bail!("cannot give -c twice");
                }
                i += 1;
                opt.c = to_double(args.get(i))?;
                i += 1;
                have_c = true;
            }
            "-s" | "-ss" => {
                if have_reg {
                    bail!("cannot give -s or -ss twice");
                }
                i += 1;
                if flag == "-s" {
                    s = to_int(args.get(i))?;
                    i += 1;
                } else {
                    if !have_dim {
                        bail!("domain must be known before -ss");
                    }
                    for _ in 0..opt.dim {
                        opt.s.push(to_int(args.get(i))?);
                        i += 1;
                    }
                    single_reg = false;
                }
                have_reg = true;
            }
            "-d" | "-dd" => {
                if have_deg {
                    bail!("cannot give -d or -dd twice");
                }
                i += 1;
                if flag == "-d" {
                    d = usize::try_from(to_int(args.get(i))?)
                        .map_err(|_| anyhow!("degree must be non-negative"))?;
                    i += 1;
                } else {
                    if !have_dim {
                        bail!("domain must be known before -dd");
                    }
                    for _ in 0..opt.dim {
                        let v = to_int(args.get(i))?;
                        opt.d.push(
                            usize::try_from(v)
                                .map_err(|_| anyhow!("degree must be non-negative"))?,
                        );
                        i += 1;
                    }
                    single_deg = false;
                }
                have_deg = true;
            }
            "-n" | "-nn" => {
                if have_ele {
                    bail!("cannot give -n or -nn twice");
                }
                i += 1;
                if flag == "-n" {
                    let v = to_int(args.get(i))?;
                    if v < 1 {
                        bail!("element count must be positive");
                    }
                    n = v as usize;
                    i += 1;
                } else {
                    if !have_dim {
                        bail!("domain must be known before -nn");
                    }
                    for _ in 0..opt.dim {
                        let v = to_int(args.get(i))?;
                        if v < 1 {
                            bail!("element count must be positive");
                        }
                        opt.n.push(v as usize);
                        i += 1;
                    }
                    single_ele = false;
                }
                have_ele = true;
            }
            "-dim" => {
                if have_dim {
                    bail!("cannot give the domain twice");
                }
                i += 1;
                let v = to_int(args.get(i))?;
                if v < 1 {
                    bail!("dimension must be positive");
                }
                opt.dim = v as usize;
                i += 1;
                have_dim = true;
            }
            "-geo" => {
                if have_dim {
                    bail!("cannot give the domain twice");
                }
                i += 1;
                let name = args
                    .get(i)
                    .ok_or_else(|| anyhow!("reached end; expected a geometry name"))?;
                i += 1;
                let text = std::fs::read_to_string("geometries.json")
                    .context("cannot read geometries.json")?;
                let table: serde_json::Value = serde_json::from_str(&text)?;
                let entry = table
                    .get(name)
                    .ok_or_else(|| anyhow!("invalid geometry name \"{name}\""))?;
                let def: GeoMapDef = serde_json::from_value(entry.clone())?;
                opt.dim = def.to_map()?.domain_dim();
                opt.geo = Some(def);
                have_dim = true;
            }
            _ => bail!("unknown option \"{}\"", args[i]),
        }
    }

    if !have_dim {
        bail!("the domain must be given with -dim or -geo");
    }
    if single_deg {
        opt.d = vec![d; opt.dim];
    }
    if single_ele {
        opt.n = vec![n; opt.dim];
    }
    if single_reg {
        opt.s = vec![s; opt.dim];
    }
    Ok(opt)
}

/// Unit hypercube as a degree-1 basis-coefficient map with one control
/// point per corner
fn identity_geometry(dim: usize) -> Result<GeoMap> {
    let comps = (0..dim)
        .map(|_| Bspline::new(1, vec![0.0, 0.0, 1.0, 1.0]))
        .collect::<Result<Vec<_>, _>>()?;
    let basis = TensorBasis::new(comps)?;
    let corners = 1usize << dim;
    let mut coefs = Mat::zeros(dim, corners);
    for i in 0..corners {
        for j in 0..dim {
            coefs[(j, i)] = ((i >> j) & 1) as f64;
        }
    }
    Ok(GeoMap::BasisCoefficient(BasisCoefficientMap::new(
        basis, coefs,
    )?))
}

/// Open knot vector on [0, 1] with `elements` uniform elements and interior
/// multiplicity `mult`
fn uniform_knots(degree: usize, elements: usize, mult: usize) -> Vec<f64> {
    let mut knots = vec![0.0; degree + 1];
    for i in 1..elements {
        let x = i as f64 / elements as f64;
        knots.extend(std::iter::repeat(x).take(mult));
    }
    knots.extend(std::iter::repeat(1.0).take(degree + 1));
    knots
}

/// Discretization space over a geometry: the requested uniform knots merged
/// with the geometry knots, raising interior multiplicities so the space
/// contains the (possibly degree-elevated) geometry
fn basis_over_geometry(
    deg: &[usize],
    ele: &[usize],
    mult: &[usize],
    geo: &GeoMap,
) -> Result<TensorBasis> {
    let underlying = match geo {
        GeoMap::BasisCoefficient(m) => m.basis(),
        GeoMap::Rational(r) => match r.underlying() {
            GeoMap::BasisCoefficient(m) => m.basis(),
            GeoMap::Rational(_) => bail!("only NURBS or B-spline geometries are supported"),
        },
    };

    let mut comps = Vec::with_capacity(deg.len());
    for dir in 0..deg.len() {
        let g = underlying.component(dir);
        let g_knots = g.knots();
        let add_mult = deg[dir].saturating_sub(g.degree());
        let st = g_knots[0];
        let en = *g_knots.last().unwrap();
        let step = (en - st) / ele[dir] as f64;

        let mut requested = vec![st; deg[dir] + 1];
        for i in 1..ele[dir] {
            requested.extend(std::iter::repeat(i as f64 * step + st).take(mult[dir]));
        }
        requested.extend(std::iter::repeat(en).take(deg[dir] + 1));

        let mut merged = Vec::with_capacity(requested.len() + g_knots.len());
        let (mut ck, mut cg) = (0, 0);
        while cg < g_knots.len() && ck < requested.len() {
            if requested[ck] >= g_knots[cg] {
                let v = g_knots[cg];
                let next_g = g_knots[cg..].iter().position(|&x| x != v).map_or(
                    g_knots.len(),
                    |p| cg + p,
                );
                let next_k = requested[ck..]
                    .iter()
                    .position(|&x| x != v)
                    .map_or(requested.len(), |p| ck + p);
                let count = (next_g - cg + add_mult).max(next_k - ck);
                merged.extend(std::iter::repeat(v).take(count));
                cg = next_g;
                ck = next_k;
            } else {
                merged.push(requested[ck]);
                ck += 1;
            }
        }
        merged.extend_from_slice(&requested[ck..]);
        merged.extend_from_slice(&g_knots[cg..]);
        comps.push(Bspline::new(deg[dir], merged)?);
    }
    Ok(TensorBasis::new(comps)?)
}

fn run(args: &[String]) -> Result<()> {
    let opt = parse_args(args)?;

    let geo = match &opt.geo {
        Some(def) => def.to_map()?,
        None => identity_geometry(opt.dim)?,
    };

    let mult: Vec<usize> = opt
        .d
        .iter()
        .zip(&opt.s)
        .map(|(&d, &s)| {
            let s = s.min(d as i64 - 1).max(-1);
            (d as i64 - s) as usize
        })
        .collect();

    let basis = if opt.geo.is_some() {
        basis_over_geometry(&opt.d, &opt.n, &mult, &geo)?
    } else {
        let comps = opt
            .d
            .iter()
            .zip(&opt.n)
            .zip(&mult)
            .map(|((&d, &n), &m)| Bspline::new(d, uniform_knots(d, n, m)))
            .collect::<Result<Vec<_>, _>>()?;
        TensorBasis::new(comps)?
    };

    let quad = recommended_quadrature(&basis, &basis);
    let eq = EqCoef::new(opt.dim, opt.a.clone(), opt.b.clone(), opt.c)?;

    let problem = ProblemDef {
        test: BasisDef::from(&basis),
        trial: BasisDef::from(&basis),
        geometry: Some(GeoMapDef::from(&geo)),
        quadrature: Some(QuadratureDef::from(&quad)),
        eq_coefs: Some(EqCoefsDef::from(&eq)),
    };
    println!("{}", serde_json::to_string(&problem)?);
    Ok(())
}

fn main() {
    env_logger::init();
    let argv: Vec<String> = std::env::args().collect();
    let args = &argv[1..];
    if let Err(e) = run(args) {
        println!("\nThe following error occurred: {e}");
        print_help(&argv[0]);
        std::process::exit(1);
    }
}
