use crate::error::{Error, Result};
use crate::models::NewRecord;
use charset::Charset;
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

/// Turns a raw RFC 822 message into a record ready for the store.
///
/// `From` and `Date` are copied as sent. `Subject` has its encoded-words
/// decoded. The body is the concatenation, in document order and with no
/// separator, of every `text/plain` leaf that is not an attachment. A
/// single-part message contributes its only payload whatever its type.
pub fn decode(raw: &[u8]) -> Result<NewRecord> {
    let parsed = mailparse::parse_mail(raw)
        .map_err(|e| Error::Decode(format!("unparsable message: {}", e)))?;

    let sender = raw_header(&parsed, "From");
    let date = raw_header(&parsed, "Date");
    let subject = parsed
        .headers
        .get_first_header("Subject")
        .map(|h| h.get_value_utf8().unwrap_or_else(|_| h.get_value()))
        .unwrap_or_default();

    let body = if parsed.ctype.mimetype.to_ascii_lowercase().starts_with("multipart/") {
        let mut body = String::new();
        collect_plain_text(&parsed, &mut body)?;
        body
    } else {
        part_text(&parsed)?
    };

    Ok(NewRecord {
        sender,
        subject,
        body,
        date,
    })
}

fn raw_header(parsed: &ParsedMail, name: &str) -> String {
    parsed
        .headers
        .get_first_header(name)
        .map(|h| String::from_utf8_lossy(h.get_value_raw()).into_owned())
        .unwrap_or_default()
}

fn collect_plain_text(part: &ParsedMail, out: &mut String) -> Result<()> {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_plain_text(sub, out)?;
        }
        return Ok(());
    }

    let is_plain = part.ctype.mimetype.eq_ignore_ascii_case("text/plain");
    let is_attachment =
        part.get_content_disposition().disposition == DispositionType::Attachment;

    if is_plain && !is_attachment {
        out.push_str(&part_text(part)?);
    }
    Ok(())
}

/// Decodes one part's payload strictly. UTF-8 and ASCII payloads must be valid
/// UTF-8; any other charset must be known and decode without replacement.
fn part_text(part: &ParsedMail) -> Result<String> {
    let charset = part.ctype.charset.to_ascii_lowercase();
    let bytes = part
        .get_body_raw()
        .map_err(|e| Error::Decode(format!("bad transfer encoding: {}", e)))?;

    match charset.as_str() {
        "" | "utf-8" | "utf8" | "us-ascii" | "ascii" => String::from_utf8(bytes).map_err(|e| {
            Error::Decode(format!(
                "{} payload is not valid {}: {}",
                part.ctype.mimetype, charset, e
            ))
        }),
        _ => {
            let decoder = Charset::for_label(charset.as_bytes())
                .ok_or_else(|| Error::Decode(format!("unknown charset {}", charset)))?;
            let (text, had_errors) = decoder.decode_without_bom_handling(&bytes);
            (!had_errors)
                .then(|| text.into_owned())
                .ok_or_else(|| {
                    Error::Decode(format!(
                        "{} payload is not valid {}",
                        part.ctype.mimetype, charset
                    ))
                })
        }
    }
}
