//! Decodificação dos frames do sensor de sótão.
//!
//! Formato do payload (`rf_data` do frame de rádio):
//!
//! ```text
//! ┌──────────┬──────────┬──────────────────┐
//! │ Temp(1)  │ Umid.(1) │ ignorado (N)     │
//! └──────────┴──────────┴──────────────────┘
//! ```
//!
//! - Temperatura em °C, inteiro sem sinal de 8 bits
//! - Umidade relativa em %RH, inteiro sem sinal de 8 bits
//! - Bytes extras são ignorados

use crate::error::DecodeError;
use crate::types::Reading;

/// Tamanho mínimo do payload (temperatura + umidade).
pub const MIN_FRAME_LEN: usize = 2;

/// Decodifica um payload bruto em [`Reading`].
///
/// O estado do ventilador ainda não tem sensor e sai sempre `false`.
pub fn decode_frame(raw: &[u8], sensor_name: &str) -> Result<Reading, DecodeError> {
    let &[temperature_c, humidity_percent, ..] = raw else {
        return Err(DecodeError::MalformedFrame {
            len: raw.len(),
            min: MIN_FRAME_LEN,
        });
    };

    Ok(Reading {
        sensor_name: sensor_name.to_string(),
        temperature_c,
        humidity_percent,
        fan_on: false,
    })
}

/// Representação hexadecimal de um frame para logs.
pub fn hex_dump(raw: &[u8]) -> String {
    raw.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_temperature_and_humidity() {
        let reading = decode_frame(&[25, 50], "attic1").unwrap();
        assert_eq!(
            reading,
            Reading {
                sensor_name: "attic1".into(),
                temperature_c: 25,
                humidity_percent: 50,
                fan_on: false,
            }
        );
    }

    #[test]
    fn bytes_are_unsigned() {
        let reading = decode_frame(&[0xFF, 0x80], "attic1").unwrap();
        assert_eq!(reading.temperature_c, 255);
        assert_eq!(reading.humidity_percent, 128);
    }

    #[test]
    fn extra_bytes_ignored() {
        let reading = decode_frame(&[20, 40, 1, 2, 3], "attic1").unwrap();
        assert_eq!(reading.temperature_c, 20);
        assert_eq!(reading.humidity_percent, 40);
        assert!(!reading.fan_on);
    }

    #[test]
    fn rejects_short_frames() {
        for raw in [&[][..], &[25][..]] {
            assert_eq!(
                decode_frame(raw, "attic1"),
                Err(DecodeError::MalformedFrame {
                    len: raw.len(),
                    min: MIN_FRAME_LEN
                })
            );
        }
    }

    #[test]
    fn hex_dump_format() {
        assert_eq!(hex_dump(&[0x19, 0x32, 0xFF]), "19 32 FF");
        assert_eq!(hex_dump(&[]), "");
    }
}
