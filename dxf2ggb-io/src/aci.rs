//! AutoCAD 颜色索引（ACI）到 24 位 RGB 的映射。

const BASIC: [u32; 10] = [
    0x000000, 0xff0000, 0xffff00, 0x00ff00, 0x00ffff, 0x0000ff, 0xff00ff, 0xffffff, 0x808080,
    0xc0c0c0,
];

const GRAYS: [u32; 6] = [0x333333, 0x5b5b5b, 0x848484, 0xadadad, 0xd6d6d6, 0xffffff];

// 10..=249：24 个色相 × 10 档亮度，奇数档为半饱和色。
const VALUES: [u8; 10] = [255, 255, 204, 204, 153, 153, 127, 127, 76, 76];

/// 返回索引对应的 0xRRGGBB；BYLAYER(256) 及越界索引返回 `None`。
pub fn aci_to_rgb(index: u16) -> Option<u32> {
    match index {
        0..=9 => Some(BASIC[index as usize]),
        10..=249 => Some(hue_ring(index)),
        250..=255 => Some(GRAYS[(index - 250) as usize]),
        _ => None,
    }
}

fn hue_ring(index: u16) -> u32 {
    let row = (index % 10) as usize;
    let value = VALUES[row] as u32;
    let low = if row % 2 == 1 { value / 2 } else { 0 };
    let hue = f64::from(index / 10 - 1) * 15.0;
    let sector = (hue / 60.0) as u32;
    let frac = (hue % 60.0) / 60.0;
    let span = f64::from(value - low);
    let rise = low + (span * frac).floor() as u32;
    let fall = (f64::from(value) - span * frac).floor() as u32;

    let (r, g, b) = match sector {
        0 => (value, rise, low),
        1 => (fall, value, low),
        2 => (low, value, rise),
        3 => (low, fall, value),
        4 => (rise, low, value),
        _ => (value, low, fall),
    };
    (r << 16) | (g << 8) | b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_colors() {
        assert_eq!(aci_to_rgb(1), Some(0xff0000));
        assert_eq!(aci_to_rgb(5), Some(0x0000ff));
        assert_eq!(aci_to_rgb(7), Some(0xffffff));
        assert_eq!(aci_to_rgb(9), Some(0xc0c0c0));
    }

    #[test]
    fn hue_ring_matches_reference_values() {
        assert_eq!(aci_to_rgb(10), Some(0xff0000));
        assert_eq!(aci_to_rgb(11), Some(0xff7f7f));
        assert_eq!(aci_to_rgb(12), Some(0xcc0000));
        assert_eq!(aci_to_rgb(13), Some(0xcc6666));
        assert_eq!(aci_to_rgb(19), Some(0x4c2626));
        assert_eq!(aci_to_rgb(20), Some(0xff3f00));
        assert_eq!(aci_to_rgb(21), Some(0xff9f7f));
        assert_eq!(aci_to_rgb(30), Some(0xff7f00));
        assert_eq!(aci_to_rgb(60), Some(0xbfff00));
        assert_eq!(aci_to_rgb(140), Some(0x00bfff));
    }

    #[test]
    fn grays_and_out_of_range() {
        assert_eq!(aci_to_rgb(250), Some(0x333333));
        assert_eq!(aci_to_rgb(255), Some(0xffffff));
        assert_eq!(aci_to_rgb(256), None);
    }
}
