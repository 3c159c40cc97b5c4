//! Minimal class-file decoder.
//!
//! Decodes just enough of the JVM class-file layout to enumerate a class's
//! own annotations, its methods, each method's annotations and per-parameter
//! annotations, and the raw method descriptor strings. The whole file is
//! decoded once into a plain in-memory representation; marker matching and
//! metadata extraction run as separate passes over it (see `extract`).
//!
//! Anything the scanner does not need (code attributes, fields beyond their
//! structural length, stack maps, signatures) is length-skipped.

use thiserror::Error;

const MAGIC: u32 = 0xCAFE_BABE;

pub const ACC_PUBLIC: u16 = 0x0001;

/// Structural failure while decoding class bytes. The caller maps this to a
/// skip-and-continue condition; it is never fatal to a scan.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ClassFormatError(pub(crate) String);

#[derive(Debug, Clone)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    StringRef(u16),
    /// Refs, name-and-type, dynamic entries: structurally consumed, never read.
    Skipped,
    /// Index 0 and the second slot of `Long`/`Double` entries.
    Unused,
}

#[derive(Debug, Clone)]
pub struct Annotation {
    /// Raw type descriptor, e.g. `Lorg/springframework/web/bind/annotation/GetMapping;`.
    pub type_descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
}

#[derive(Debug, Clone)]
pub enum ElementValue {
    /// String literal or stringified primitive constant.
    Const(String),
    EnumConst {
        type_descriptor: String,
        const_name: String,
    },
    ClassInfo(String),
    Array(Vec<ElementValue>),
    Nested(Annotation),
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub annotations: Vec<Annotation>,
    /// Indexed by parameter position; visible and invisible tables merged.
    pub parameter_annotations: Vec<Vec<Annotation>>,
}

impl MethodInfo {
    pub fn is_public(&self) -> bool {
        self.access_flags & ACC_PUBLIC != 0
    }
}

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub constant_pool: Vec<Constant>,
    pub access_flags: u16,
    pub this_class: u16,
    pub annotations: Vec<Annotation>,
    pub methods: Vec<MethodInfo>,
}

pub fn decode(bytes: &[u8]) -> Result<ClassFile, ClassFormatError> {
    let mut r = Reader::new(bytes);

    if r.u32()? != MAGIC {
        return Err(ClassFormatError("bad magic number".to_string()));
    }
    r.u16()?; // minor
    r.u16()?; // major

    let pool = decode_constant_pool(&mut r)?;

    let access_flags = r.u16()?;
    let this_class = r.u16()?;
    r.u16()?; // super_class

    let interfaces_count = r.u16()? as usize;
    r.take(interfaces_count * 2)?;

    let fields_count = r.u16()? as usize;
    for _ in 0..fields_count {
        skip_member(&mut r)?;
    }

    let methods_count = r.u16()? as usize;
    let mut methods = Vec::with_capacity(methods_count);
    for _ in 0..methods_count {
        methods.push(decode_method(&mut r, &pool)?);
    }

    let mut annotations = Vec::new();
    let attr_count = r.u16()? as usize;
    for _ in 0..attr_count {
        let name_index = r.u16()?;
        let length = r.u32()? as usize;
        let payload = r.take(length)?;
        let name = utf8(&pool, name_index)?;
        if name == "RuntimeVisibleAnnotations" || name == "RuntimeInvisibleAnnotations" {
            annotations.extend(decode_annotation_table(payload, &pool)?);
        }
    }

    Ok(ClassFile {
        constant_pool: pool,
        access_flags,
        this_class,
        annotations,
        methods,
    })
}

fn decode_constant_pool(r: &mut Reader<'_>) -> Result<Vec<Constant>, ClassFormatError> {
    let count = r.u16()? as usize;
    let mut pool = Vec::with_capacity(count);
    pool.push(Constant::Unused);

    while pool.len() < count {
        let tag = r.u8()?;
        match tag {
            1 => {
                let length = r.u16()? as usize;
                let bytes = r.take(length)?;
                pool.push(Constant::Utf8(String::from_utf8_lossy(bytes).into_owned()));
            }
            3 => pool.push(Constant::Integer(r.u32()? as i32)),
            4 => pool.push(Constant::Float(f32::from_bits(r.u32()?))),
            5 => {
                let bits = (u64::from(r.u32()?) << 32) | u64::from(r.u32()?);
                pool.push(Constant::Long(bits as i64));
                pool.push(Constant::Unused);
            }
            6 => {
                let bits = (u64::from(r.u32()?) << 32) | u64::from(r.u32()?);
                pool.push(Constant::Double(f64::from_bits(bits)));
                pool.push(Constant::Unused);
            }
            7 => pool.push(Constant::Class(r.u16()?)),
            8 => pool.push(Constant::StringRef(r.u16()?)),
            9 | 10 | 11 | 12 | 17 | 18 => {
                r.u16()?;
                r.u16()?;
                pool.push(Constant::Skipped);
            }
            15 => {
                r.u8()?;
                r.u16()?;
                pool.push(Constant::Skipped);
            }
            16 | 19 | 20 => {
                r.u16()?;
                pool.push(Constant::Skipped);
            }
            other => {
                return Err(ClassFormatError(format!("unknown constant tag {other}")));
            }
        }
    }

    Ok(pool)
}

fn skip_member(r: &mut Reader<'_>) -> Result<(), ClassFormatError> {
    r.u16()?; // access_flags
    r.u16()?; // name_index
    r.u16()?; // descriptor_index
    let attr_count = r.u16()? as usize;
    for _ in 0..attr_count {
        r.u16()?;
        let length = r.u32()? as usize;
        r.take(length)?;
    }
    Ok(())
}

fn decode_method(r: &mut Reader<'_>, pool: &[Constant]) -> Result<MethodInfo, ClassFormatError> {
    let access_flags = r.u16()?;
    let name = utf8(pool, r.u16()?)?.to_string();
    let descriptor = utf8(pool, r.u16()?)?.to_string();

    let mut annotations = Vec::new();
    let mut parameter_annotations: Vec<Vec<Annotation>> = Vec::new();

    let attr_count = r.u16()? as usize;
    for _ in 0..attr_count {
        let name_index = r.u16()?;
        let length = r.u32()? as usize;
        let payload = r.take(length)?;
        match utf8(pool, name_index)? {
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                annotations.extend(decode_annotation_table(payload, pool)?);
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let table = decode_parameter_annotation_table(payload, pool)?;
                for (index, entries) in table.into_iter().enumerate() {
                    if parameter_annotations.len() <= index {
                        parameter_annotations.resize_with(index + 1, Vec::new);
                    }
                    parameter_annotations[index].extend(entries);
                }
            }
            _ => {}
        }
    }

    Ok(MethodInfo {
        access_flags,
        name,
        descriptor,
        annotations,
        parameter_annotations,
    })
}

fn decode_annotation_table(
    payload: &[u8],
    pool: &[Constant],
) -> Result<Vec<Annotation>, ClassFormatError> {
    let mut r = Reader::new(payload);
    let count = r.u16()? as usize;
    let mut annotations = Vec::with_capacity(count);
    for _ in 0..count {
        annotations.push(decode_annotation(&mut r, pool)?);
    }
    Ok(annotations)
}

fn decode_parameter_annotation_table(
    payload: &[u8],
    pool: &[Constant],
) -> Result<Vec<Vec<Annotation>>, ClassFormatError> {
    let mut r = Reader::new(payload);
    let num_parameters = r.u8()? as usize;
    let mut table = Vec::with_capacity(num_parameters);
    for _ in 0..num_parameters {
        let count = r.u16()? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(decode_annotation(&mut r, pool)?);
        }
        table.push(entries);
    }
    Ok(table)
}

fn decode_annotation(r: &mut Reader<'_>, pool: &[Constant]) -> Result<Annotation, ClassFormatError> {
    let type_descriptor = utf8(pool, r.u16()?)?.to_string();
    let pair_count = r.u16()? as usize;
    let mut elements = Vec::with_capacity(pair_count);
    for _ in 0..pair_count {
        let name = utf8(pool, r.u16()?)?.to_string();
        let value = decode_element_value(r, pool)?;
        elements.push((name, value));
    }
    Ok(Annotation {
        type_descriptor,
        elements,
    })
}

fn decode_element_value(
    r: &mut Reader<'_>,
    pool: &[Constant],
) -> Result<ElementValue, ClassFormatError> {
    let tag = r.u8()?;
    match tag {
        b's' => Ok(ElementValue::Const(utf8(pool, r.u16()?)?.to_string())),
        b'B' | b'C' | b'I' | b'S' | b'Z' | b'J' | b'F' | b'D' => {
            Ok(ElementValue::Const(const_string(pool, r.u16()?)?))
        }
        b'e' => {
            let type_descriptor = utf8(pool, r.u16()?)?.to_string();
            let const_name = utf8(pool, r.u16()?)?.to_string();
            Ok(ElementValue::EnumConst {
                type_descriptor,
                const_name,
            })
        }
        b'c' => Ok(ElementValue::ClassInfo(utf8(pool, r.u16()?)?.to_string())),
        b'@' => Ok(ElementValue::Nested(decode_annotation(r, pool)?)),
        b'[' => {
            let count = r.u16()? as usize;
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(decode_element_value(r, pool)?);
            }
            Ok(ElementValue::Array(values))
        }
        other => Err(ClassFormatError(format!(
            "unknown element value tag {other}"
        ))),
    }
}

fn utf8(pool: &[Constant], index: u16) -> Result<&str, ClassFormatError> {
    match pool.get(index as usize) {
        Some(Constant::Utf8(s)) => Ok(s),
        _ => Err(ClassFormatError(format!(
            "constant {index} is not a utf8 entry"
        ))),
    }
}

fn const_string(pool: &[Constant], index: u16) -> Result<String, ClassFormatError> {
    match pool.get(index as usize) {
        Some(Constant::Integer(v)) => Ok(v.to_string()),
        Some(Constant::Long(v)) => Ok(v.to_string()),
        Some(Constant::Float(v)) => Ok(v.to_string()),
        Some(Constant::Double(v)) => Ok(v.to_string()),
        Some(Constant::Utf8(s)) => Ok(s.clone()),
        _ => Err(ClassFormatError(format!(
            "constant {index} is not a literal entry"
        ))),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], ClassFormatError> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| ClassFormatError("truncated class file".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFormatError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFormatError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFormatError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
