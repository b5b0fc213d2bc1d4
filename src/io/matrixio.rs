//! On-disk sparse matrix format
//!
//! Layout: a header of four little-endian i32 `{rowMajor, rows, cols,
//! nnzs}`, one null byte, then the outer start offsets (`rows+1` or
//! `cols+1` i32), the inner indices (`nnzs` i32) and the values (`nnzs`
//! f64). The names `"stdout"` and `"stdin"` are streaming pseudo-paths.
//!
//! Transfers resume after partial reads and writes: interrupted calls
//! (`EINTR`) are retried, and a would-block error (`EAGAIN`, from a
//! descriptor some parent process left in non-blocking mode) is handled by
//! forcing the descriptor into blocking mode once and retrying.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::algebra::MMatrix;
use crate::error::{IgaError, IgaResult};

/// A sparse matrix as stored on disk, in row- or column-major CSR
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixData {
    pub row_major: bool,
    pub rows: usize,
    pub cols: usize,
    pub outer_start: Vec<i32>,
    pub inner_idx: Vec<i32>,
    pub values: Vec<f64>,
}

impl MatrixData {
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn valid(&self) -> bool {
        self.rows > 0 && self.cols > 0
    }

    /// Convert to CSR regardless of the stored orientation
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.rows, self.cols);
        let outer_count = self.outer_start.len() - 1;
        for outer in 0..outer_count {
            let beg = self.outer_start[outer] as usize;
            let end = self.outer_start[outer + 1] as usize;
            for p in beg..end {
                let inner = self.inner_idx[p] as usize;
                if self.row_major {
                    coo.push(outer, inner, self.values[p]);
                } else {
                    coo.push(inner, outer, self.values[p]);
                }
            }
        }
        CsrMatrix::from(&coo)
    }

    /// Dense expansion (for echoing and debugging)
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.rows, self.cols);
        let csr = self.to_csr();
        for (r, c, &v) in csr.triplet_iter() {
            mat[(r, c)] = v;
        }
        mat
    }
}

impl From<&MMatrix> for MatrixData {
    fn from(m: &MMatrix) -> Self {
        Self {
            row_major: true,
            rows: m.rows(),
            cols: m.cols(),
            outer_start: m.sparsity().row_starts().iter().map(|&v| v as i32).collect(),
            inner_idx: m.sparsity().col_indices().iter().map(|&v| v as i32).collect(),
            values: m.values().to_vec(),
        }
    }
}

#[cfg(unix)]
type Descriptor = RawFd;
#[cfg(not(unix))]
type Descriptor = ();

#[cfg(unix)]
fn descriptor_of<T: AsRawFd>(t: &T) -> Descriptor {
    t.as_raw_fd()
}

#[cfg(not(unix))]
fn descriptor_of<T>(_t: &T) -> Descriptor {}

/// Clear `O_NONBLOCK` on a descriptor that reported `EAGAIN`
#[cfg(unix)]
fn set_blocking(fd: Descriptor) -> std::io::Result<()> {
    use nix::fcntl::{fcntl, FcntlArg, OFlag};

    let os_err = |e: nix::Error| std::io::Error::from_raw_os_error(e as i32);
    let bits = fcntl(fd, FcntlArg::F_GETFL).map_err(os_err)?;
    let flags = OFlag::from_bits_truncate(bits) & !OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(os_err)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_blocking(_fd: Descriptor) -> std::io::Result<()> {
    Ok(())
}

/// Writer that resumes partial writes, retries `EINTR` and forces the
/// descriptor into blocking mode on the first `EAGAIN`
struct BlockingWriter<'a> {
    inner: &'a mut dyn Write,
    fd: Descriptor,
    forced: bool,
}

impl BlockingWriter<'_> {
    fn write_all(&mut self, mut buf: &[u8]) -> IgaResult<()> {
        while !buf.is_empty() {
            match self.inner.write(buf) {
                Ok(0) => {
                    return Err(IgaError::IoError(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "write accepted zero bytes",
                    )))
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock && !self.forced => {
                    set_blocking(self.fd)?;
                    self.forced = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn write_i32s(&mut self, data: &[i32]) -> IgaResult<()> {
        for &v in data {
            self.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    fn write_f64s(&mut self, data: &[f64]) -> IgaResult<()> {
        for &v in data {
            self.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }
}

/// Reader with the same resume-and-force-blocking policy as
/// [`BlockingWriter`]
struct BlockingReader<'a> {
    inner: &'a mut dyn Read,
    fd: Descriptor,
    forced: bool,
}

impl BlockingReader<'_> {
    fn read_exact(&mut self, mut buf: &mut [u8]) -> IgaResult<()> {
        while !buf.is_empty() {
            match self.inner.read(buf) {
                Ok(0) => return Err(IgaError::Parse("unexpected end of file".into())),
                Ok(n) => {
                    let rest = buf;
                    buf = &mut rest[n..];
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock && !self.forced => {
                    set_blocking(self.fd)?;
                    self.forced = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn read_i32s(&mut self, count: usize) -> IgaResult<Vec<i32>> {
        let mut buf = [0u8; 4];
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            self.read_exact(&mut buf)?;
            out.push(i32::from_le_bytes(buf));
        }
        Ok(out)
    }

    fn read_f64s(&mut self, count: usize) -> IgaResult<Vec<f64>> {
        let mut buf = [0u8; 8];
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            self.read_exact(&mut buf)?;
            out.push(f64::from_le_bytes(buf));
        }
        Ok(out)
    }
}

/// Write a matrix file; `"stdout"` streams to the standard output
pub fn write_matrix(data: &MatrixData, name: &str) -> IgaResult<()> {
    let stdout = std::io::stdout();
    let mut file;
    let mut lock;
    let (inner, fd): (&mut dyn Write, Descriptor) = if name == "stdout" {
        lock = stdout.lock();
        let fd = descriptor_of(&lock);
        (&mut lock, fd)
    } else {
        file = File::create(name)?;
        let fd = descriptor_of(&file);
        (&mut file, fd)
    };
    let mut w = BlockingWriter {
        inner,
        fd,
        forced: false,
    };

    w.write_i32s(&[
        data.row_major as i32,
        data.rows as i32,
        data.cols as i32,
        data.nnz() as i32,
    ])?;
    w.write_all(&[0u8])?;
    w.write_i32s(&data.outer_start)?;
    w.write_i32s(&data.inner_idx)?;
    w.write_f64s(&data.values)?;
    w.inner.flush()?;
    Ok(())
}

/// Read a matrix file; `"stdin"` streams from the standard input
pub fn read_matrix(name: &str) -> IgaResult<MatrixData> {
    let stdin = std::io::stdin();
    let mut file;
    let mut lock;
    let (inner, fd): (&mut dyn Read, Descriptor) = if name == "stdin" {
        lock = stdin.lock();
        let fd = descriptor_of(&lock);
        (&mut lock, fd)
    } else {
        file = File::open(name)?;
        let fd = descriptor_of(&file);
        (&mut file, fd)
    };
    let mut r = BlockingReader {
        inner,
        fd,
        forced: false,
    };

    let head = r.read_i32s(4)?;
    let (row_major, rows, cols, nnzs) = (head[0] != 0, head[1], head[2], head[3]);
    if rows < 0 || cols < 0 || nnzs < 0 {
        return Err(IgaError::Parse("negative size in matrix header".into()));
    }

    let mut null = [1u8; 1];
    r.read_exact(&mut null)?;
    if null[0] != 0 {
        return Err(IgaError::Parse("no null byte after matrix header".into()));
    }

    let outer_count = if row_major { rows + 1 } else { cols + 1 } as usize;
    let outer_start = r.read_i32s(outer_count)?;
    let inner_idx = r.read_i32s(nnzs as usize)?;
    let values = r.read_f64s(nnzs as usize)?;

    Ok(MatrixData {
        row_major,
        rows: rows as usize,
        cols: cols as usize,
        outer_start,
        inner_idx,
        values,
    })
}
