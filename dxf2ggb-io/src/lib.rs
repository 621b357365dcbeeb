pub mod aci;
pub mod archive;

use std::fs;
use std::path::Path;

use dxf2ggb_core::{
    drawing::{BlockRecord, Drawing, DxfEntity, EntityBody, LayerRecord, PolylineSource},
    geometry::Point2,
};
use thiserror::Error;
use tracing::debug;

pub use archive::{GgbArchiveWriter, MarkupSink};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to package archive {path:?}: {source}")]
    Archive {
        path: std::path::PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Drawing, IoError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 解析内存中的 DXF 文本。
    pub fn parse_str(&self, source: &str) -> Result<Drawing, IoError> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        DxfParser::new(source).parse().map_err(|err| match err {
            DxfError::Unsupported { feature } => IoError::UnsupportedFeature(feature),
            DxfError::Invalid { message } => IoError::InvalidDocument(message),
        })
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Drawing, IoError> {
        // 测绘软件导出的 DXF 常为 ANSI 代码页，非 UTF-8 字节按替换字符处理。
        let bytes = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let data = String::from_utf8_lossy(&bytes);
        let drawing = self.parse_str(&data)?;
        debug!(
            path = %path.display(),
            entities = drawing.entity_count(),
            "DXF 解析完成"
        );
        Ok(drawing)
    }
}

#[derive(Debug)]
enum DxfError {
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Drawing, DxfError> {
        let mut drawing = Drawing::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code == 999 {
                continue;
            }
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "HEADER" => self.parse_header(&mut drawing)?,
                        "TABLES" => self.parse_tables(&mut drawing)?,
                        "BLOCKS" => self.parse_blocks(&mut drawing)?,
                        "ENTITIES" => self.parse_entities(&mut drawing)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(drawing)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_header(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        let mut variable: Option<String> = None;
        let mut pending_x: Option<f64> = None;
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("HEADER 段提前结束")),
            };
            match code {
                0 if value.trim() == "ENDSEC" => break,
                9 => {
                    variable = Some(value.trim().to_string());
                    pending_x = None;
                }
                10 if is_extent_variable(variable.as_deref()) => {
                    assign_coord(&mut pending_x, &value, "HEADER 范围 X（组码 10）")?;
                }
                20 if is_extent_variable(variable.as_deref()) => {
                    let y = parse_f64(&value, "HEADER 范围 Y（组码 20）")?;
                    let x = pending_x
                        .take()
                        .ok_or_else(|| DxfError::invalid("HEADER 范围 Y 之前缺少 X（组码 10）"))?;
                    match variable.as_deref() {
                        Some("$EXTMIN") => drawing.set_extent_min(Point2::new(x, y)),
                        _ => drawing.set_extent_max(Point2::new(x, y)),
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_tables(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("TABLES 段提前结束")),
            };
            if code != 0 {
                continue;
            }
            match value.trim() {
                "ENDSEC" => break,
                "TABLE" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("TABLE 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "TABLE 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    if name.trim() == "LAYER" {
                        self.parse_layer_table(drawing)?;
                    } else {
                        self.skip_table()?;
                    }
                }
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    fn parse_layer_table(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ENDTAB" => break,
                    "LAYER" => {
                        let layer = self.parse_layer_record()?;
                        drawing.add_layer(layer);
                    }
                    _ => self.skip_entity_body()?,
                },
                // 表头的句柄、计数等
                Some(_) => continue,
                None => return Err(DxfError::invalid("LAYER 表未找到 ENDTAB 终止标记")),
            }
        }
        Ok(())
    }

    fn parse_layer_record(&mut self) -> Result<LayerRecord, DxfError> {
        let mut name = None;
        let mut indexed: Option<u32> = None;
        let mut true_color: Option<u32> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    2 => name = Some(value.trim().to_string()),
                    62 => {
                        // 负值表示图层关闭，颜色取绝对值。
                        let index = parse_i32(&value, "LAYER 颜色索引")?.unsigned_abs();
                        indexed = u16::try_from(index).ok().and_then(aci::aci_to_rgb);
                        if indexed.is_none() {
                            debug!(index, "LAYER 颜色索引超出 ACI 范围");
                        }
                    }
                    420 => {
                        let rgb = parse_i32(&value, "LAYER 真彩色")?;
                        true_color = Some((rgb as u32) & 0x00ff_ffff);
                    }
                    _ => {}
                },
                None => return Err(DxfError::invalid("LAYER 记录未正确结束")),
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("LAYER 缺少名称（组码 2）"))?;
        Ok(LayerRecord {
            name,
            color: true_color.or(indexed),
        })
    }

    fn skip_table(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDTAB" => break,
                Some(_) => continue,
                None => return Err(DxfError::invalid("TABLE 未找到 ENDTAB 终止标记")),
            }
        }
        Ok(())
    }

    fn parse_blocks(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("BLOCKS 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "BLOCKS 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "BLOCK" => {
                    let block = self.parse_block_record()?;
                    drawing.add_block(block);
                }
                _ => {
                    // 未预期的条目（例如孤立的 ENDBLK），直接跳过
                    self.skip_entity_body()?;
                }
            }
        }
        Ok(())
    }

    fn parse_block_record(&mut self) -> Result<BlockRecord, DxfError> {
        let mut name = None;
        let mut name2 = None;
        let mut layer = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    2 => name = Some(value.trim().to_string()),
                    3 => name2 = Some(value.trim().to_string()),
                    8 => layer = Some(value.trim().to_string()),
                    _ => {}
                },
                None => return Err(DxfError::invalid("BLOCK 未正确结束")),
            }
        }

        // 块内实体只用于符号绘制，这里不需要。
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDBLK" => {
                    self.skip_entity_body()?;
                    break;
                }
                Some((0, _)) => self.skip_entity_body()?,
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "BLOCK 内出现意外组码 {code} 值 {value}"
                    )));
                }
                None => return Err(DxfError::invalid("BLOCK 未找到 ENDBLK 终止标记")),
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("BLOCK 缺少块名（组码 2）"))?;
        Ok(BlockRecord {
            name,
            name2,
            layer: layer.unwrap_or_else(|| "0".to_string()),
        })
    }

    fn parse_entities(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "SEQEND" | "VERTEX" | "ATTRIB" => {
                    self.skip_entity_body()?;
                }
                "POLYLINE" => {
                    let parsed = self.parse_polyline_chain()?;
                    drawing.push_entity(parsed);
                }
                entity => {
                    let kind = entity.to_string();
                    let parsed = self.parse_entity(&kind)?;
                    drawing.push_entity(parsed);
                }
            }
        }
        Ok(())
    }

    fn parse_entity(&mut self, kind: &str) -> Result<DxfEntity, DxfError> {
        match kind {
            "INSERT" => self.parse_insert(),
            "LINE" => self.parse_line(),
            "LWPOLYLINE" => self.parse_lwpolyline(),
            "TEXT" => self.parse_text(),
            "" => Err(DxfError::unsupported("实体类型为空")),
            other => self.parse_other(other),
        }
    }

    fn parse_insert(&mut self) -> Result<DxfEntity, DxfError> {
        let mut layer = None;
        let mut name = None;
        let mut insert_x = None;
        let mut insert_y = None;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    2 => {
                        if name.is_some() {
                            return Err(DxfError::invalid("INSERT 遇到重复的块名（组码 2）"));
                        }
                        name = Some(value.trim().to_string());
                    }
                    10 => assign_coord(&mut insert_x, &value, "INSERT 插入点 X（组码 10）")?,
                    20 => assign_coord(&mut insert_y, &value, "INSERT 插入点 Y（组码 20）")?,
                    // 缩放、旋转、属性标志等对转换无影响
                    _ => {}
                },
                None => return Err(DxfError::invalid("INSERT 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let name = name.ok_or_else(|| DxfError::invalid("INSERT 缺少块名（组码 2）"))?;
        let ix = insert_x.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 Y（组码 20）"))?;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ATTRIB" => self.skip_entity_body()?,
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "INSERT 属性段出现意外组码 {code} 值 {value}"
                    )));
                }
                None => break,
            }
        }

        Ok(DxfEntity::new(
            layer,
            EntityBody::Insert {
                block: name,
                position: Point2::new(ix, iy),
            },
        ))
    }

    fn parse_line(&mut self) -> Result<DxfEntity, DxfError> {
        let mut layer = None;
        let mut start_x = None;
        let mut start_y = None;
        let mut end_x = None;
        let mut end_y = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut start_x, &value, "LINE 起点 X（组码 10）")?,
                    20 => assign_coord(&mut start_y, &value, "LINE 起点 Y（组码 20）")?,
                    11 => assign_coord(&mut end_x, &value, "LINE 终点 X（组码 11）")?,
                    21 => assign_coord(&mut end_y, &value, "LINE 终点 Y（组码 21）")?,
                    30 | 31 => {} // 忽略 Z 坐标
                    _ => {}
                },
                None => return Err(DxfError::invalid("LINE 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let sx = start_x.ok_or_else(|| DxfError::invalid("LINE 缺少起点 X（组码 10）"))?;
        let sy = start_y.ok_or_else(|| DxfError::invalid("LINE 缺少起点 Y（组码 20）"))?;
        let ex = end_x.ok_or_else(|| DxfError::invalid("LINE 缺少终点 X（组码 11）"))?;
        let ey = end_y.ok_or_else(|| DxfError::invalid("LINE 缺少终点 Y（组码 21）"))?;

        Ok(DxfEntity::new(
            layer,
            EntityBody::Polyline {
                source: PolylineSource::Line,
                vertices: vec![Point2::new(sx, sy), Point2::new(ex, ey)],
            },
        ))
    }

    fn parse_lwpolyline(&mut self) -> Result<DxfEntity, DxfError> {
        let mut layer = None;
        let mut vertices: Vec<Point2> = Vec::new();
        let mut pending_x: Option<f64> = None;
        let mut pending_y: Option<f64> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => {
                        let x = parse_f64(&value, "LWPOLYLINE 顶点 X")?;
                        if let Some(y) = pending_y.take() {
                            vertices.push(Point2::new(x, y));
                        } else if pending_x.replace(x).is_some() {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                            ));
                        }
                    }
                    20 => {
                        let y = parse_f64(&value, "LWPOLYLINE 顶点 Y")?;
                        if let Some(x) = pending_x.take() {
                            vertices.push(Point2::new(x, y));
                        } else if pending_y.replace(y).is_some() {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 顶点缺少对应的 X（组码 10）",
                            ));
                        }
                    }
                    // 闭合标志不参与转换：首尾相连必须由重复的顶点显式给出
                    70 | 90 | 30 | 42 => {}
                    _ => {}
                },
                None => return Err(DxfError::invalid("LWPOLYLINE 未正确结束")),
            }
        }

        if pending_x.is_some() || pending_y.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }

        if vertices.is_empty() {
            return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        Ok(DxfEntity::new(
            layer,
            EntityBody::Polyline {
                source: PolylineSource::LwPolyline,
                vertices,
            },
        ))
    }

    fn parse_text(&mut self) -> Result<DxfEntity, DxfError> {
        let mut layer = None;
        let mut insert_x = None;
        let mut insert_y = None;
        let mut text: Option<String> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut insert_x, &value, "TEXT 插入点 X（组码 10）")?,
                    20 => assign_coord(&mut insert_y, &value, "TEXT 插入点 Y（组码 20）")?,
                    1 => match text {
                        Some(ref mut existing) => {
                            existing.push('\n');
                            existing.push_str(&value);
                        }
                        None => text = Some(value),
                    },
                    // 文字高度、样式、对齐信息等
                    _ => {}
                },
                None => return Err(DxfError::invalid("TEXT 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let ix = insert_x.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 Y（组码 20）"))?;
        let text = text.ok_or_else(|| DxfError::invalid("TEXT 缺少文本内容（组码 1）"))?;

        Ok(DxfEntity::new(
            layer,
            EntityBody::Text {
                start: Point2::new(ix, iy),
                text,
            },
        ))
    }

    /// 老式 POLYLINE 由 VERTEX 序列和 SEQEND 组成，整体记为一个未处理实体。
    fn parse_polyline_chain(&mut self) -> Result<DxfEntity, DxfError> {
        let entity = self.parse_other("POLYLINE")?;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => self.skip_entity_body()?,
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "POLYLINE 顶点序列出现意外组码 {code} 值 {value}"
                    )));
                }
                None => return Err(DxfError::invalid("POLYLINE 未找到 SEQEND 终止标记")),
            }
        }
        Ok(entity)
    }

    fn parse_other(&mut self, kind: &str) -> Result<DxfEntity, DxfError> {
        let mut layer = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((8, value)) => layer = Some(value.trim().to_string()),
                Some(_) => continue,
                None => return Err(DxfError::invalid(format!("{kind} 未正确结束"))),
            }
        }
        Ok(DxfEntity::new(
            layer.unwrap_or_else(|| "0".to_string()),
            EntityBody::Other {
                kind: kind.to_string(),
            },
        ))
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // 文件末尾常见多余空行
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "内部错误：尝试多次回退 DXF pair");
        self.buffer = Some(pair);
    }
}

fn is_extent_variable(variable: Option<&str>) -> bool {
    matches!(variable, Some("$EXTMIN") | Some("$EXTMAX"))
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}
