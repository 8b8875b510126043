//! Training data providers.

use crate::network::Error;

/// One training record: an input vector and the output the network should produce for it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataPair<'a> {
    pub input: &'a [f64],
    pub ideal: &'a [f64],
}

/// A randomly indexable, read-only collection of training records.
///
/// Data sets are shared between gradient workers while an epoch runs, so they must be `Sync` and
/// must return the same record for an index every time it is requested.
pub trait DataSet: Sync {
    /// Returns the number of records.
    fn len(&self) -> usize;

    /// Returns `true` if there are no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the length of each input vector.
    fn input_size(&self) -> usize;

    /// Returns the length of each ideal vector.
    fn ideal_size(&self) -> usize;

    /// Returns the record at `index`.
    fn record(&self, index: usize) -> Result<DataPair<'_>, Error>;
}

/// An in-memory [`DataSet`] that stores its records in two flat arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicDataSet {
    input_size: usize,
    ideal_size: usize,
    inputs: Vec<f64>,
    ideals: Vec<f64>,
}

impl BasicDataSet {
    /// Returns an empty `BasicDataSet` for records of the given sizes.
    pub fn new(input_size: usize, ideal_size: usize) -> Self {
        Self {
            input_size,
            ideal_size,
            inputs: Vec::new(),
            ideals: Vec::new(),
        }
    }

    /// Builds a `BasicDataSet` from `(input, ideal)` pairs. The sizes are taken from the first
    /// pair and every other pair must match them.
    pub fn from_pairs<I, O>(pairs: &[(I, O)]) -> Result<Self, Error>
    where
        I: AsRef<[f64]>,
        O: AsRef<[f64]>,
    {
        let (input_size, ideal_size) = pairs
            .first()
            .map(|(input, ideal)| (input.as_ref().len(), ideal.as_ref().len()))
            .unwrap_or((0, 0));

        let mut data = Self::new(input_size, ideal_size);
        for (input, ideal) in pairs {
            data.push(input.as_ref(), ideal.as_ref())?;
        }

        Ok(data)
    }

    /// Appends a record.
    pub fn push(&mut self, input: &[f64], ideal: &[f64]) -> Result<(), Error> {
        if input.len() != self.input_size {
            return Err(Error::InvalidInputSize(self.input_size, input.len()));
        }
        if ideal.len() != self.ideal_size {
            return Err(Error::InvalidIdealSize(self.ideal_size, ideal.len()));
        }

        self.inputs.extend_from_slice(input);
        self.ideals.extend_from_slice(ideal);
        Ok(())
    }
}

impl DataSet for BasicDataSet {
    fn len(&self) -> usize {
        if self.input_size > 0 {
            self.inputs.len() / self.input_size
        } else if self.ideal_size > 0 {
            self.ideals.len() / self.ideal_size
        } else {
            0
        }
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn ideal_size(&self) -> usize {
        self.ideal_size
    }

    fn record(&self, index: usize) -> Result<DataPair<'_>, Error> {
        if index >= self.len() {
            return Err(Error::RecordOutOfRange(index, self.len()));
        }

        let input = index * self.input_size;
        let ideal = index * self.ideal_size;
        Ok(DataPair {
            input: &self.inputs[input..input + self.input_size],
            ideal: &self.ideals[ideal..ideal + self.ideal_size],
        })
    }
}

/// Slices of `(input, ideal)` pairs are data sets. Sizes are taken from the first pair; pairs that
/// differ are reported as errors when they are evaluated.
impl<I, O> DataSet for [(I, O)]
where
    I: AsRef<[f64]> + Sync,
    O: AsRef<[f64]> + Sync,
{
    fn len(&self) -> usize {
        <[(I, O)]>::len(self)
    }

    fn input_size(&self) -> usize {
        self.first().map_or(0, |(input, _)| input.as_ref().len())
    }

    fn ideal_size(&self) -> usize {
        self.first().map_or(0, |(_, ideal)| ideal.as_ref().len())
    }

    fn record(&self, index: usize) -> Result<DataPair<'_>, Error> {
        self.get(index)
            .map(|(input, ideal)| DataPair {
                input: input.as_ref(),
                ideal: ideal.as_ref(),
            })
            .ok_or_else(|| Error::RecordOutOfRange(index, <[(I, O)]>::len(self)))
    }
}
