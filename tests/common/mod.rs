//! Builds small but realistic OOXML fixtures on the fly

#![allow(dead_code)]

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

fn write_zip(path: &Path, parts: &[(String, String)]) {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        writer
            .start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A .docx whose i-th comment is anchored on paragraph i (wrapping around)
pub fn write_docx(dir: &Path, name: &str, paragraphs: &[&str], comments: &[(&str, &str)]) -> PathBuf {
    let mut body = String::new();
    for (index, text) in paragraphs.iter().enumerate() {
        let anchored: Vec<usize> = (0..comments.len())
            .filter(|c| c % paragraphs.len() == index)
            .collect();

        body.push_str(r#"<w:p><w:pPr><w:pStyle w:val="Normal"/></w:pPr>"#);
        for id in &anchored {
            body.push_str(&format!(r#"<w:commentRangeStart w:id="{id}"/>"#));
        }
        body.push_str(&format!(
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape(text)
        ));
        for id in &anchored {
            body.push_str(&format!(
                r#"<w:commentRangeEnd w:id="{id}"/><w:r><w:rPr><w:rStyle w:val="CommentReference"/></w:rPr><w:commentReference w:id="{id}"/></w:r>"#
            ));
        }
        body.push_str("</w:p>");
    }

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
    );

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    );
    let mut document_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    );

    let mut parts = vec![
        ("_rels/.rels".to_string(), r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#.to_string()),
        ("word/document.xml".to_string(), document),
        ("word/styles.xml".to_string(), r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style></w:styles>"#.to_string()),
    ];

    if !comments.is_empty() {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:comments xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml">"#,
        );
        for (id, (author, text)) in comments.iter().enumerate() {
            xml.push_str(&format!(
                r#"<w:comment w:id="{id}" w:author="{}" w:date="2024-03-01T09:00:00Z" w:initials="X"><w:p w14:paraId="{:08X}"><w:r><w:t>{}</w:t></w:r></w:p></w:comment>"#,
                escape(author),
                0x1000 + id,
                escape(text)
            ));
        }
        xml.push_str("</w:comments>");
        parts.push(("word/comments.xml".to_string(), xml));

        content_types.push_str(r#"<Override PartName="/word/comments.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml"/>"#);
        document_rels.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="comments.xml"/>"#);
    }

    content_types.push_str("</Types>");
    document_rels.push_str("</Relationships>");
    parts.insert(0, ("[Content_Types].xml".to_string(), content_types));
    parts.push(("word/_rels/document.xml.rels".to_string(), document_rels));

    let path = dir.join(name);
    write_zip(&path, &parts);
    path
}

/// Cell contents: plain numbers become `<v>`, a leading `=` becomes `<f>`
pub fn write_xlsx(dir: &Path, name: &str, cells: &[(&str, &str)], comments: &[(&str, &str)]) -> PathBuf {
    let mut sheet_data = String::new();
    for (reference, value) in cells {
        let row: String = reference.chars().filter(char::is_ascii_digit).collect();
        let content = match value.strip_prefix('=') {
            Some(formula) => format!("<f>{}</f>", escape(formula)),
            None => format!("<v>{}</v>", escape(value)),
        };
        sheet_data.push_str(&format!(r#"<row r="{row}"><c r="{reference}">{content}</c></row>"#));
    }

    let legacy_drawing = if comments.is_empty() {
        ""
    } else {
        r#"<legacyDrawing r:id="rId2"/>"#
    };
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData>{sheet_data}</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>{legacy_drawing}</worksheet>"#
    );

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="vml" ContentType="application/vnd.openxmlformats-officedocument.vmlDrawing"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    );

    let mut parts = vec![
        ("_rels/.rels".to_string(), r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string()),
        ("xl/workbook.xml".to_string(), r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView xWindow="0" yWindow="0"/></bookViews><sheets><sheet name="Budget" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string()),
        ("xl/_rels/workbook.xml.rels".to_string(), r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string()),
        ("xl/worksheets/sheet1.xml".to_string(), sheet),
    ];

    if !comments.is_empty() {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors><author>Reviewer</author></authors><commentList>"#,
        );
        let mut vml = String::from(
            r#"<xml xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" xmlns:x="urn:schemas-microsoft-com:office:excel"><o:shapelayout v:ext="edit"><o:idmap v:ext="edit" data="1"/></o:shapelayout><v:shapetype id="_x0000_t202" coordsize="21600,21600" o:spt="202" path="m,l,21600r21600,l21600,xe"><v:stroke joinstyle="miter"/><v:path gradientshapeok="t" o:connecttype="rect"/></v:shapetype>"#,
        );

        for (index, (reference, text)) in comments.iter().enumerate() {
            xml.push_str(&format!(
                r#"<comment ref="{reference}" authorId="0"><text><r><rPr><b/></rPr><t>Reviewer:</t></r><r><t xml:space="preserve">{}</t></r></text></comment>"#,
                escape(text)
            ));

            let column = reference
                .chars()
                .take_while(char::is_ascii_alphabetic)
                .fold(0u32, |acc, c| acc * 26 + (c as u32 - 'A' as u32 + 1))
                - 1;
            let row: u32 = reference
                .chars()
                .skip_while(char::is_ascii_alphabetic)
                .collect::<String>()
                .parse::<u32>()
                .unwrap()
                - 1;
            vml.push_str(&format!(
                r##"<v:shape id="_x0000_s{}" type="#_x0000_t202" style="position:absolute;visibility:hidden" fillcolor="#ffffe1"><v:textbox/><x:ClientData ObjectType="Note"><x:MoveWithCells/><x:SizeWithCells/><x:AutoFill>False</x:AutoFill><x:Row>{row}</x:Row><x:Column>{column}</x:Column></x:ClientData></v:shape>"##,
                1025 + index
            ));
        }
        xml.push_str("</commentList></comments>");
        vml.push_str("</xml>");

        parts.push(("xl/comments1.xml".to_string(), xml));
        parts.push(("xl/drawings/vmlDrawing1.vml".to_string(), vml));
        parts.push((
            "xl/worksheets/_rels/sheet1.xml.rels".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing" Target="../drawings/vmlDrawing1.vml"/></Relationships>"#
                .to_string(),
        ));
        content_types.push_str(r#"<Override PartName="/xl/comments1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml"/>"#);
    }

    content_types.push_str("</Types>");
    parts.insert(0, ("[Content_Types].xml".to_string(), content_types));

    let path = dir.join(name);
    write_zip(&path, &parts);
    path
}

/// Contents of one package part, if present
pub fn read_part(package: &Path, name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(fs::File::open(package).unwrap()).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    Some(content)
}

/// Text of every body paragraph of a .docx, in order
pub fn paragraph_texts(docx: &Path) -> Vec<String> {
    let xml = read_part(docx, "word/document.xml").unwrap();
    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().unwrap() {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == b"w:p" => current.clear(),
            Event::End(e) if e.name().as_ref() == b"w:p" => paragraphs.push(current.clone()),
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
            Event::Text(e) if in_text => current.push_str(&e.unescape().unwrap()),
            _ => {}
        }
    }

    paragraphs
}

/// The `<sheetData>` element of the first worksheet
pub fn sheet_data(xlsx: &Path) -> String {
    let xml = read_part(xlsx, "xl/worksheets/sheet1.xml").unwrap();
    let start = xml.find("<sheetData>").unwrap();
    let end = xml.find("</sheetData>").unwrap() + "</sheetData>".len();
    xml[start..end].to_string()
}

/// Bytes of an OLE compound file header, enough to look like a legacy .doc/.xls
pub fn write_legacy_binary(dir: &Path, name: &str) -> PathBuf {
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.resize(512, 0);
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}
