use std::path::PathBuf;

use dxf2ggb_core::{
    drawing::{EntityBody, PolylineSource},
    geometry::Point2,
};
use dxf2ggb_io::{DocumentLoader, DxfFacade, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn load_cadastral_sheet_fills_tables_and_entities() {
    let loader = DxfFacade::new();
    let drawing = loader.load(&fixture("sheet_a.dxf")).expect("读取 DXF 失败");

    let extents = drawing.extents().expect("缺少图形范围");
    assert_eq!(extents.min, Point2::new(0.0, 0.0));
    assert_eq!(extents.max, Point2::new(100.0, 50.0));

    assert_eq!(drawing.layer("L1").and_then(|l| l.color), Some(0xff0000));
    assert_eq!(drawing.layer("grenze").and_then(|l| l.color), Some(0x0000ff));
    assert_eq!(drawing.layer("text").and_then(|l| l.color), Some(0xffffff));

    let block = drawing.block("ABM_1000").expect("缺少块 ABM_1000");
    assert_eq!(block.layer, "L1");
    assert_eq!(block.name2.as_deref(), Some("Grenzpunkt 17"));
    assert!(drawing.block("*Model_Space").is_some());

    let entities: Vec<_> = drawing.entities().collect();
    assert_eq!(entities.len(), 5, "块内的 CIRCLE 不应出现在实体列表中");

    assert_eq!(entities[0].layer, "L1");
    assert_eq!(
        entities[0].body,
        EntityBody::Insert {
            block: "ABM_1000".to_string(),
            position: Point2::new(10.0, 20.0),
        }
    );
    assert_eq!(
        entities[1].body,
        EntityBody::Polyline {
            source: PolylineSource::Line,
            vertices: vec![Point2::new(10.0, 20.0), Point2::new(5.0, 5.0)],
        }
    );
    assert_eq!(
        entities[2].body,
        EntityBody::Polyline {
            source: PolylineSource::LwPolyline,
            vertices: vec![
                Point2::new(5.0, 5.0),
                Point2::new(30.0, 5.0),
                Point2::new(30.0, 40.0),
            ],
        }
    );
    assert_eq!(entities[3].layer, "text");
    assert_eq!(
        entities[3].body,
        EntityBody::Text {
            start: Point2::new(50.0, 25.0),
            text: "Flur 3".to_string(),
        }
    );
    assert!(matches!(&entities[4].body, EntityBody::Other { kind } if kind == "CIRCLE"));
}

#[test]
fn load_rejects_line_without_end_point() {
    let loader = DxfFacade::new();
    let err = loader
        .load(&fixture("broken_line.dxf"))
        .expect_err("缺少终点的 LINE 应报错");
    match err {
        IoError::InvalidDocument(message) => assert!(message.contains("LINE"), "{message}"),
        other => panic!("意外的错误类型: {other:?}"),
    }
}

#[test]
fn load_reports_missing_file() {
    let loader = DxfFacade::new();
    let err = loader
        .load(&fixture("does_not_exist.dxf"))
        .expect_err("不存在的文件应报错");
    assert!(matches!(err, IoError::ReadError { .. }));
}
