use crate::checkpoint::{CheckpointContents, ParameterEntry};
use crate::utils::error::VisionError;
use crate::Result;
use candle_core::pickle::{Object, Stack};
use std::io::{BufRead, Cursor, Read};
use zip::ZipArchive;

/// 旧版 torch.save 写在文件开头的魔数 (protocol 2, LONG1)
pub const LEGACY_MAGIC: &[u8] = b"\x80\x02\x8a\x0al\xfc\x9cF\xf9 j\xa8P\x19.";

/// 魔数之后、数据之前的 pickle: protocol_version, sys_info
const LEGACY_HEADER_PICKLES: usize = 2;

/// state_dict 附带的版本信息，不是参数
const METADATA_KEY: &str = "_metadata";

pub fn is_zip_archive(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

/// 解析 PyTorch 检查点 (zip 归档或裸 pickle)，只读取对象结构
pub fn inspect_pickle(bytes: &[u8]) -> Result<CheckpointContents> {
    let object = if is_zip_archive(bytes) {
        read_archive_payload(bytes)?
    } else {
        read_raw_payload(bytes)?
    };
    Ok(contents_from_object(object))
}

fn read_archive_payload(bytes: &[u8]) -> Result<Object> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let entry_name = archive
        .file_names()
        .find(|name| name.ends_with("data.pkl"))
        .map(str::to_string)
        .ok_or_else(|| {
            VisionError::UnsupportedFormat("PyTorch archive has no data.pkl entry".to_string())
        })?;
    tracing::debug!("Reading pickle payload from archive entry '{}'", entry_name);

    let mut payload = Vec::new();
    archive.by_name(&entry_name)?.read_to_end(&mut payload)?;
    read_object(&mut Cursor::new(payload.as_slice()))
}

fn read_raw_payload(bytes: &[u8]) -> Result<Object> {
    let mut reader = Cursor::new(bytes);
    if let Some(rest) = bytes.strip_prefix(LEGACY_MAGIC) {
        tracing::debug!("Legacy torch.save layout, skipping header pickles");
        reader = Cursor::new(rest);
        for _ in 0..LEGACY_HEADER_PICKLES {
            read_object(&mut reader)?;
        }
    }
    read_object(&mut reader)
}

fn read_object<R: BufRead>(reader: &mut R) -> Result<Object> {
    let mut stack = Stack::empty();
    stack.read_loop(reader)?;
    Ok(stack.finalize()?)
}

/// 顶层是字典时按插入顺序列出键，否则给出对象类型
pub fn contents_from_object(object: Object) -> CheckpointContents {
    let object = match object {
        // OrderedDict 的属性通过 BUILD 附加
        Object::Build { callable, args } => match *callable {
            Object::Dict(items) => Object::Dict(items),
            callable => Object::Build {
                callable: Box::new(callable),
                args,
            },
        },
        other => other,
    };

    match object {
        Object::Dict(items) => {
            let entries = items
                .into_iter()
                .filter_map(|(key, value)| {
                    let name = match key {
                        Object::Unicode(name) => name,
                        other => format!("{:?}", other),
                    };
                    if name == METADATA_KEY {
                        return None;
                    }
                    let (dtype, shape) = describe_value(&value);
                    Some(ParameterEntry { name, dtype, shape })
                })
                .collect();
            CheckpointContents::Mapping(entries)
        }
        other => CheckpointContents::Unrecognized {
            reason: format!("top-level object is {}", describe_object(&other)),
        },
    }
}

/// 张量返回 (dtype, shape)，其他值返回 Python 类型名
fn describe_value(value: &Object) -> (String, Vec<usize>) {
    match value {
        Object::Reduce { callable, args } => match (callable.as_ref(), args.as_ref()) {
            (Object::Class { class_name, .. }, Object::Tuple(fields))
                if class_name == "_rebuild_parameter" =>
            {
                fields
                    .first()
                    .map(describe_value)
                    .unwrap_or_else(|| ("Parameter".to_string(), Vec::new()))
            }
            (Object::Class { class_name, .. }, Object::Tuple(fields))
                if class_name.starts_with("_rebuild_tensor") =>
            {
                let dtype = fields
                    .first()
                    .and_then(storage_dtype)
                    .unwrap_or_else(|| "tensor".to_string());
                let shape = match fields.get(2) {
                    Some(Object::Tuple(dims)) => dims
                        .iter()
                        .filter_map(|dim| match dim {
                            Object::Int(n) => usize::try_from(*n).ok(),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                (dtype, shape)
            }
            _ => (describe_object(value), Vec::new()),
        },
        Object::List(items) => ("list".to_string(), vec![items.len()]),
        Object::Tuple(items) => ("tuple".to_string(), vec![items.len()]),
        other => (describe_object(other), Vec::new()),
    }
}

/// persistent id: ("storage", torch.FloatStorage, key, location, numel)
fn storage_dtype(storage: &Object) -> Option<String> {
    let Object::PersistentLoad(id) = storage else {
        return None;
    };
    let Object::Tuple(fields) = id.as_ref() else {
        return None;
    };
    let Some(Object::Class { class_name, .. }) = fields.get(1) else {
        return None;
    };

    let dtype = match class_name.as_str() {
        "FloatStorage" => "F32",
        "DoubleStorage" => "F64",
        "HalfStorage" => "F16",
        "BFloat16Storage" => "BF16",
        "LongStorage" => "I64",
        "IntStorage" => "I32",
        "ShortStorage" => "I16",
        "CharStorage" => "I8",
        "ByteStorage" => "U8",
        "BoolStorage" => "BOOL",
        other => other,
    };
    Some(dtype.to_string())
}

fn describe_object(object: &Object) -> String {
    match object {
        Object::Dict(_) => "dict".to_string(),
        Object::List(_) => "list".to_string(),
        Object::Tuple(_) => "tuple".to_string(),
        Object::Int(_) => "int".to_string(),
        Object::Float(_) => "float".to_string(),
        Object::Unicode(_) => "str".to_string(),
        Object::None => "None".to_string(),
        Object::Class {
            module_name,
            class_name,
        } => format!("{}.{}", module_name, class_name),
        // 实例：REDUCE/BUILD 链最内层的类
        Object::Reduce { callable, .. } | Object::Build { callable, .. } => {
            format!("an instance of {}", describe_object(callable))
        }
        _ => "an unsupported object".to_string(),
    }
}
