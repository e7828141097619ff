/**
 * First-party numeric backend. Tensors here are rank-1 or rank-2 rectangular
 * dense arrays, row-major, with a uniform element type (`int` or `float`).
 * Stands in for the reference implementation's use of numpy, narrowed to the
 * rank and element-type restrictions the language actually needs.
 */

use std::fmt;

use crate::ast::Type;
use crate::value::Value;

/** One element of an index tuple, per axis. */
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndexValue {
    Int(i64),
    Range(i64, i64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
    is_int: bool,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f64>, is_int: bool) -> Tensor {
        assert_eq!(shape.iter().product::<usize>(), data.len());
        Tensor {
            shape,
            data,
            is_int,
        }
    }

    pub fn from_vector(data: Vec<f64>, is_int: bool) -> Tensor {
        let len = data.len();
        Tensor::new(vec![len], data, is_int)
    }

    pub fn from_rows(rows: Vec<Vec<f64>>, is_int: bool) -> Result<Tensor, String> {
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != ncols) {
            return Err("tensor rows must all have the same length".to_string());
        }
        let nrows = rows.len();
        let data = rows.into_iter().flatten().collect();
        Ok(Tensor::new(vec![nrows, ncols], data, is_int))
    }

    pub fn zeros(dims: &[usize]) -> Tensor {
        let len: usize = dims.iter().product();
        Tensor::new(dims.to_vec(), vec![0.0; len], true)
    }

    pub fn ones(dims: &[usize]) -> Tensor {
        let len: usize = dims.iter().product();
        Tensor::new(dims.to_vec(), vec![1.0; len], true)
    }

    pub fn eye(n: usize) -> Tensor {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Tensor::new(vec![n, n], data, true)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn element_type(&self) -> Type {
        if self.is_int {
            Type::Int
        } else {
            Type::Float
        }
    }

    fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.shape[1] + col]
    }

    fn promote_display(&self, v: f64) -> String {
        if self.is_int {
            format!("{}", v as i64)
        } else {
            format!("{}", v)
        }
    }

    pub fn transpose(&self) -> Tensor {
        match self.shape.len() {
            1 => Tensor::new(vec![1, self.shape[0]], self.data.clone(), self.is_int),
            2 => {
                let (rows, cols) = (self.shape[0], self.shape[1]);
                let mut data = vec![0.0; rows * cols];
                for r in 0..rows {
                    for c in 0..cols {
                        data[c * rows + r] = self.at(r, c);
                    }
                }
                Tensor::new(vec![cols, rows], data, self.is_int)
            }
            _ => unreachable!("tensors are rank 1 or 2"),
        }
    }

    pub fn negate(&self) -> Tensor {
        Tensor::new(
            self.shape.clone(),
            self.data.iter().map(|v| -v).collect(),
            self.is_int,
        )
    }

    /** Element-wise binary op; both operands must share a shape. */
    pub fn elementwise(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Result<Tensor, String> {
        if self.shape != other.shape {
            return Err("tensors of incompatible shapes".to_string());
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| f(*a, *b))
            .collect();
        Ok(Tensor::new(
            self.shape.clone(),
            data,
            self.is_int && other.is_int,
        ))
    }

    fn resolve_range(idx: IndexValue, dim_size: usize) -> Result<(usize, usize), String> {
        match idx {
            IndexValue::Int(i) => {
                if i < 0 || i as usize >= dim_size {
                    return Err("index out of bounds".to_string());
                }
                Ok((i as usize, 1))
            }
            IndexValue::Range(start, end) => {
                if start < 0 || end < start || end as usize > dim_size {
                    return Err("index out of bounds".to_string());
                }
                Ok((start as usize, (end - start) as usize))
            }
        }
    }

    pub fn get(&self, indices: &[IndexValue]) -> Result<Value, String> {
        match (self.shape.len(), indices.len()) {
            (1, 1) => {
                let (start, len) = Tensor::resolve_range(indices[0], self.shape[0])?;
                if matches!(indices[0], IndexValue::Int(_)) {
                    Ok(self.scalar_value(self.data[start]))
                } else {
                    Ok(Value::Tensor(Tensor::new(
                        vec![len],
                        self.data[start..start + len].to_vec(),
                        self.is_int,
                    )))
                }
            }
            (2, 1) => {
                let (start, len) = Tensor::resolve_range(indices[0], self.shape[0])?;
                let cols = self.shape[1];
                let data = self.data[start * cols..(start + len) * cols].to_vec();
                if matches!(indices[0], IndexValue::Int(_)) {
                    Ok(Value::Tensor(Tensor::new(vec![cols], data, self.is_int)))
                } else {
                    Ok(Value::Tensor(Tensor::new(vec![len, cols], data, self.is_int)))
                }
            }
            (2, 2) => {
                let (row_start, row_len) = Tensor::resolve_range(indices[0], self.shape[0])?;
                let (col_start, col_len) = Tensor::resolve_range(indices[1], self.shape[1])?;
                let row_scalar = matches!(indices[0], IndexValue::Int(_));
                let col_scalar = matches!(indices[1], IndexValue::Int(_));

                let mut data = Vec::with_capacity(row_len * col_len);
                for r in row_start..row_start + row_len {
                    for c in col_start..col_start + col_len {
                        data.push(self.at(r, c));
                    }
                }

                match (row_scalar, col_scalar) {
                    (true, true) => Ok(self.scalar_value(data[0])),
                    (true, false) => Ok(Value::Tensor(Tensor::new(vec![col_len], data, self.is_int))),
                    (false, true) => Ok(Value::Tensor(Tensor::new(vec![row_len], data, self.is_int))),
                    (false, false) => Ok(Value::Tensor(Tensor::new(vec![row_len, col_len], data, self.is_int))),
                }
            }
            _ => Err("index arity does not match tensor rank".to_string()),
        }
    }

    pub fn set(&mut self, indices: &[IndexValue], value: Value) -> Result<(), String> {
        if indices.len() != self.shape.len() {
            return Err("index arity does not match tensor rank".to_string());
        }
        let raw = match value {
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
            other => return Err(format!("cannot assign a {} into a tensor element", other.type_name())),
        };

        match self.shape.len() {
            1 => {
                let (start, _) = Tensor::resolve_range(indices[0], self.shape[0])?;
                self.data[start] = raw;
            }
            2 => {
                let (row, _) = Tensor::resolve_range(indices[0], self.shape[0])?;
                let (col, _) = Tensor::resolve_range(indices[1], self.shape[1])?;
                let cols = self.shape[1];
                self.data[row * cols + col] = raw;
            }
            _ => unreachable!("tensors are rank 1 or 2"),
        }
        Ok(())
    }

    fn scalar_value(&self, raw: f64) -> Value {
        if self.is_int {
            Value::Int(raw as i64)
        } else {
            Value::Float(raw)
        }
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape.len() {
            1 => {
                let parts: Vec<String> = self.data.iter().map(|v| self.promote_display(*v)).collect();
                write!(f, "[{}]", parts.join(" "))
            }
            2 => {
                let cols = self.shape[1];
                let rows: Vec<String> = (0..self.shape[0])
                    .map(|r| {
                        let parts: Vec<String> = (0..cols)
                            .map(|c| self.promote_display(self.at(r, c)))
                            .collect();
                        format!("[{}]", parts.join(" "))
                    })
                    .collect();
                write!(f, "[{}]", rows.join(" "))
            }
            _ => unreachable!("tensors are rank 1 or 2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_vector_becomes_row_matrix() {
        let t = Tensor::from_vector(vec![1.0, 2.0, 3.0], true);
        let transposed = t.transpose();
        assert_eq!(transposed.shape(), &[1, 3]);
    }

    #[test]
    fn transpose_matrix_swaps_dims() {
        let t = Tensor::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], true).unwrap();
        let transposed = t.transpose();
        assert_eq!(transposed.shape(), &[2, 3]);
        assert_eq!(transposed.get(&[IndexValue::Int(0), IndexValue::Int(2)]).unwrap(), Value::Int(5));
    }

    #[test]
    fn elementwise_rejects_mismatched_shapes() {
        let a = Tensor::from_vector(vec![1.0, 2.0], true);
        let b = Tensor::from_vector(vec![1.0, 2.0, 3.0], true);
        assert!(a.elementwise(&b, |x, y| x + y).is_err());
    }

    #[test]
    fn matrix_row_index_returns_vector() {
        let m = Tensor::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]], true).unwrap();
        let row = m.get(&[IndexValue::Int(1)]).unwrap();
        match row {
            Value::Tensor(t) => assert_eq!(t.shape(), &[2]),
            other => panic!("expected tensor row, got {:?}", other),
        }
    }

    #[test]
    fn eye_is_identity() {
        let id = Tensor::eye(2);
        assert_eq!(id.get(&[IndexValue::Int(0), IndexValue::Int(0)]).unwrap(), Value::Int(1));
        assert_eq!(id.get(&[IndexValue::Int(0), IndexValue::Int(1)]).unwrap(), Value::Int(0));
    }

    #[test]
    fn set_updates_single_element() {
        let mut m = Tensor::zeros(&[2, 2]);
        m.set(&[IndexValue::Int(0), IndexValue::Int(1)], Value::Int(9)).unwrap();
        assert_eq!(m.get(&[IndexValue::Int(0), IndexValue::Int(1)]).unwrap(), Value::Int(9));
    }
}
