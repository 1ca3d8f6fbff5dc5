//! Decoded field values.

use thiserror::Error;

use crate::base_type::BaseType;

/// An error encoding a value back to its wire form.
#[derive(Debug, Error)]
pub enum ValueError {
    /// Encoded value does not fit the declared field size.
    #[error("Encoded value does not fit the declared field size ({needed} > {size}).")]
    Oversize { size: usize, needed: usize },
    /// Element is incompatible with the field's base type.
    #[error("Element is incompatible with base type {base_type:?}.")]
    Incompatible { base_type: BaseType },
}

/// One raw element of a decoded field.
///
/// Values holding their base type's 'invalid' marker are kept as an explicit
/// [`Invalid`](Element::Invalid) element, never coerced to a number.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    UInt(u64),
    SInt(i64),
    Float(f64),
    String(String),
    Invalid,
}

/// A decoded field: an ordered list of raw elements of one base type.
///
/// Fields decoded from a document cache their source bytes, which later
/// passes (subfield resolution) reinterpret and the encoder uses to preserve
/// the declared field size. Replacing the elements through
/// [`set_elements`](Self::set_elements) drops the cache, letting the encoder
/// derive a fresh size.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    base_type: BaseType,
    elements: Vec<Element>,
    source: Option<Vec<u8>>,
}

impl FieldValue {
    /// Create a value from raw elements.
    pub fn new(base_type: BaseType, elements: Vec<Element>) -> Self {
        Self {
            base_type,
            elements,
            source: None,
        }
    }

    /// Create a single-element value.
    pub fn single(base_type: BaseType, element: Element) -> Self {
        Self::new(base_type, vec![element])
    }

    /// Create a single-string value.
    pub fn string(s: impl Into<String>) -> Self {
        Self::single(BaseType::String, Element::String(s.into()))
    }

    /// Create a value holding its base type's 'invalid' marker.
    pub fn invalid(base_type: BaseType) -> Self {
        Self::single(base_type, Element::Invalid)
    }

    /// Decode a field's wire bytes into elements, caching the source.
    pub fn decode(base_type: BaseType, r: &[u8], big_endian: bool) -> Self {
        let elements = match base_type {
            BaseType::String => decode_strings(r),
            BaseType::Byte => r.iter().map(|b| Element::UInt(*b as u64)).collect(),
            t => decode_numbers(t, r, big_endian),
        };

        Self {
            base_type,
            elements,
            source: Some(r.to_vec()),
        }
    }

    /// Encode this value's elements to exactly `size` wire bytes.
    ///
    /// String arrays are padded with NUL bytes, numeric arrays by appending
    /// 'invalid' elements, until the declared size is met. Values that cannot
    /// be shrunk to fit fail with [`ValueError::Oversize`].
    pub fn encode(&self, size: usize, big_endian: bool) -> Result<Vec<u8>, ValueError> {
        let mut w = Vec::with_capacity(size);

        match self.base_type {
            BaseType::String => {
                for element in &self.elements {
                    let Element::String(s) = element else {
                        Err(ValueError::Incompatible {
                            base_type: self.base_type,
                        })?
                    };

                    w.extend_from_slice(s.as_bytes());
                    w.push(0);
                }

                // The final terminator is dropped when the text exactly fills
                // the field.
                if w.len() == size + 1 {
                    w.pop();
                }

                if w.len() > size {
                    Err(ValueError::Oversize {
                        size,
                        needed: w.len(),
                    })?
                }

                w.resize(size, 0);
            }
            t => {
                for element in &self.elements {
                    t.write_bits(element_bits(t, element)?, big_endian, &mut w);
                }

                if w.len() > size {
                    Err(ValueError::Oversize {
                        size,
                        needed: w.len(),
                    })?
                }

                while w.len() + t.width() <= size {
                    t.write_bits(t.invalid_bits(), big_endian, &mut w);
                }

                // A ragged declared size leaves a remainder narrower than one
                // element; fill it from the marker pattern.
                while w.len() < size {
                    w.push(t.invalid_bits().to_le_bytes()[0]);
                }
            }
        }

        Ok(w)
    }

    /// The base type of this value's elements.
    pub fn base_type(&self) -> BaseType {
        self.base_type
    }

    /// The raw elements of this value.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The cached wire bytes this value was decoded from, if any.
    pub fn source(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }

    /// Replace this value's elements, dropping any cached source bytes.
    pub fn set_elements(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.source = None;
    }

    /// The number of wire bytes this value occupies.
    ///
    /// Values decoded from a document keep their declared size; constructed
    /// values derive one from their elements.
    pub fn wire_size(&self) -> usize {
        if let Some(source) = &self.source {
            return source.len();
        }

        match self.base_type {
            BaseType::String => self
                .elements
                .iter()
                .map(|e| match e {
                    Element::String(s) => s.len() + 1,
                    _ => 1,
                })
                .sum::<usize>()
                .max(1),
            t => t.width() * self.elements.len().max(1),
        }
    }

    /// Whether this value holds any data beyond its 'invalid' marker.
    ///
    /// Byte arrays are invalid only when every byte holds the marker, strings
    /// when no text is present.
    pub fn is_valid(&self) -> bool {
        match self.base_type {
            BaseType::String => !self.elements.is_empty(),
            BaseType::Byte => self
                .elements
                .iter()
                .any(|e| !matches!(e, Element::UInt(0xFF))),
            _ => self
                .elements
                .iter()
                .any(|e| !matches!(e, Element::Invalid)),
        }
    }

    /// The first element as an unsigned integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self.elements.first()? {
            Element::UInt(x) => Some(*x),
            Element::SInt(x) => u64::try_from(*x).ok(),
            _ => None,
        }
    }

    /// The first element as a signed integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self.elements.first()? {
            Element::SInt(x) => Some(*x),
            Element::UInt(x) => i64::try_from(*x).ok(),
            _ => None,
        }
    }

    /// The first element as a float, converting from integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self.elements.first()? {
            Element::Float(x) => Some(*x),
            Element::UInt(x) => Some(*x as f64),
            Element::SInt(x) => Some(*x as f64),
            _ => None,
        }
    }

    /// The first element as text, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self.elements.first()? {
            Element::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value's integer elements combined into one raw bit pattern, for
    /// component expansion.
    ///
    /// Byte arrays combine least-significant-first; other integer types use
    /// their first element. Returns `None` for invalid, float, and string
    /// values.
    pub(crate) fn raw_bits(&self) -> Option<u64> {
        if self.base_type == BaseType::Byte {
            if !self.is_valid() {
                return None;
            }

            let mut bits = 0;
            for (i, element) in self.elements.iter().enumerate().take(8) {
                let Element::UInt(b) = element else { return None };
                bits |= b << (8 * i);
            }
            return Some(bits);
        }

        match self.elements.first()? {
            Element::UInt(x) => Some(*x),
            Element::SInt(x) => u64::try_from(*x).ok(),
            _ => None,
        }
    }
}

/// Split a field's bytes into NUL-terminated strings.
///
/// Each terminator ends an element; runs of padding produce none, so a field
/// with no text decodes to zero elements.
fn decode_strings(r: &[u8]) -> Vec<Element> {
    r.split(|b| *b == 0)
        .filter(|run| !run.is_empty())
        .map(|run| Element::String(String::from_utf8_lossy(run).into_owned()))
        .collect()
}

/// Decode fixed-width numeric elements until the field's bytes are exhausted.
fn decode_numbers(t: BaseType, r: &[u8], big_endian: bool) -> Vec<Element> {
    r.chunks_exact(t.width())
        .map(|chunk| {
            let bits = t.read_bits(chunk, big_endian);

            match t {
                BaseType::Float32 => {
                    let x = f32::from_bits(bits as u32);
                    if x.is_nan() {
                        Element::Invalid
                    } else {
                        Element::Float(x as f64)
                    }
                }
                BaseType::Float64 => {
                    let x = f64::from_bits(bits);
                    if x.is_nan() {
                        Element::Invalid
                    } else {
                        Element::Float(x)
                    }
                }
                t if t.is_signed() => {
                    if bits == t.invalid_bits() {
                        Element::Invalid
                    } else {
                        Element::SInt(bits as i64)
                    }
                }
                t => {
                    if bits == t.invalid_bits() {
                        Element::Invalid
                    } else {
                        Element::UInt(bits)
                    }
                }
            }
        })
        .collect()
}

/// Convert an element to the raw bit pattern of a numeric base type.
fn element_bits(t: BaseType, element: &Element) -> Result<u64, ValueError> {
    Ok(match element {
        Element::Invalid => t.invalid_bits(),
        Element::UInt(x) => match t {
            BaseType::Float32 => (*x as f32).to_bits() as u64,
            BaseType::Float64 => (*x as f64).to_bits(),
            _ => *x,
        },
        Element::SInt(x) => match t {
            BaseType::Float32 => (*x as f32).to_bits() as u64,
            BaseType::Float64 => (*x as f64).to_bits(),
            _ => *x as u64,
        },
        Element::Float(x) => match t {
            BaseType::Float32 => (*x as f32).to_bits() as u64,
            BaseType::Float64 => x.to_bits(),
            _ => x.round() as i64 as u64,
        },
        Element::String(_) => Err(ValueError::Incompatible { base_type: t })?,
    })
}
