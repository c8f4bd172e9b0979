/*!
Drive fixtures shaped like Glances `/api/3/fs` entries
*/

use serde_json::{json, Value};

/// One filesystem entry as a Glances agent reports it.
///
/// `percent` is derived from `used / size` and rounded to one decimal, the way
/// the agent does it.
pub fn drive(device_name: &str, mnt_point: &str, size: u64, used: u64, free: u64) -> Value {
    let percent = if size > 0 {
        (used as f64 / size as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    json!({
        "device_name": device_name,
        "fs_type": "ext4",
        "mnt_point": mnt_point,
        "size": size,
        "used": used,
        "free": free,
        "percent": percent,
        "key": "mnt_point"
    })
}

/// Wraps drives into the JSON array returned by the endpoint
pub fn drive_list<I>(drives: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    Value::Array(drives.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_fields() {
        let sda = drive("sda", "/", 200, 50, 150);
        assert_eq!(sda["device_name"], "sda");
        assert_eq!(sda["mnt_point"], "/");
        assert_eq!(sda["size"], 200);
        assert_eq!(sda["percent"], 25.0);
    }

    #[test]
    fn test_empty_drive_has_zero_percent() {
        assert_eq!(drive("loop0", "/snap", 0, 0, 0)["percent"], 0.0);
    }

    #[test]
    fn test_drive_list_keeps_order() {
        let list = drive_list([drive("sdb", "/b", 1, 0, 1), drive("sda", "/a", 1, 0, 1)]);
        assert_eq!(list[0]["device_name"], "sdb");
        assert_eq!(list[1]["device_name"], "sda");
    }
}
