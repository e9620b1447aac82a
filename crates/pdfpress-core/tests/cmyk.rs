mod common;

use common::{PdfBuilder, content_of, xobjects};
use lopdf::{Dictionary, dictionary};
use pdfpress_core::{
    Cmyk, CmykConverter, ColorTable, PressError, RgbKey, convert_cmyk_colors,
};
use pretty_assertions::assert_eq;

fn table(entries: &[([u16; 3], [u16; 4])]) -> ColorTable {
    entries
        .iter()
        .map(|&(rgb, cmyk)| (RgbKey::from(rgb), Cmyk::from(cmyk)))
        .collect()
}

fn convert(pdf: &[u8], table: &ColorTable) -> Vec<u8> {
    CmykConverter::new(table)
        .with_compression(false)
        .convert(pdf)
        .unwrap()
}

#[test]
fn test_fill_and_stroke_are_kept_apart() {
    let mut pdf = PdfBuilder::new();
    let contents = pdf.stream(b"1 0 0 rg 1 0 0 RG 0 0 10 10 re B");
    pdf.page(contents, Dictionary::new());
    let input = pdf.build();

    let table = table(&[([10000, 0, 0], [0, 10000, 10000, 0])]);
    let output = convert(&input, &table);
    assert_eq!(
        content_of(&output, contents),
        b"0 1 1 0 k 0 1 1 0 K 0 0 10 10 re B".to_vec()
    );
}

#[test]
fn test_fractional_components() {
    let mut pdf = PdfBuilder::new();
    let contents = pdf.stream(b"q 0.2 0.4 0.6 rg f Q");
    pdf.page(contents, Dictionary::new());
    let input = pdf.build();

    let table = table(&[([2000, 4000, 6000], [2500, 0, 10000, 500])]);
    let output = convert(&input, &table);
    assert_eq!(
        content_of(&output, contents),
        b"q 0.25 0 1 0.05 k f Q".to_vec()
    );
}

#[test]
fn test_unmapped_colors_stay_rgb() {
    let mut pdf = PdfBuilder::new();
    let contents = pdf.stream(b"0 1 0 rg 1 0 0 rg");
    pdf.page(contents, Dictionary::new());
    let input = pdf.build();

    let table = table(&[([10000, 0, 0], [0, 10000, 10000, 0])]);
    let output = convert_cmyk_colors(&input, &table, true).unwrap();
    assert_eq!(content_of(&output, contents), b"0 1 0 rg 0 1 1 0 k".to_vec());
}

#[test]
fn test_empty_table_leaves_content_unchanged() {
    let mut pdf = PdfBuilder::new();
    let contents = pdf.stream(b"1 0 0 rg 0.5 0.5 0.5 RG");
    pdf.page(contents, Dictionary::new());
    let input = pdf.build();

    let output = convert(&input, &ColorTable::new());
    assert_eq!(
        content_of(&output, contents),
        b"1 0 0 rg 0.5 0.5 0.5 RG".to_vec()
    );
}

#[test]
fn test_forms_and_appearances_are_converted() {
    let mut pdf = PdfBuilder::new();
    let inner = pdf.form(b"0 0 1 rg", Dictionary::new());
    let outer = pdf.form(b"0 0 1 RG /Inner Do", xobjects(vec![("Inner", inner)]));
    let appearance = pdf.form(b"0 0 1 rg", Dictionary::new());
    let contents = pdf.stream(b"/Outer Do");
    let annot = pdf.doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Square",
        "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
        "AP" => dictionary! { "N" => appearance },
    });
    pdf.page_with(dictionary! {
        "Contents" => contents,
        "Resources" => xobjects(vec![("Outer", outer)]),
        "Annots" => vec![annot.into()],
    });
    let input = pdf.build();

    let table = table(&[([0, 0, 10000], [10000, 10000, 0, 0])]);
    let output = convert(&input, &table);
    assert_eq!(content_of(&output, inner), b"1 1 0 0 k".to_vec());
    assert_eq!(content_of(&output, outer), b"1 1 0 0 K /Inner Do".to_vec());
    assert_eq!(content_of(&output, appearance), b"1 1 0 0 k".to_vec());
}

#[test]
fn test_self_referencing_form_terminates() {
    let mut pdf = PdfBuilder::new();
    let form_id = pdf.doc.new_object_id();
    let form = lopdf::Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            "Resources" => xobjects(vec![("Self", form_id)]),
        },
        b"1 0 0 rg /Self Do".to_vec(),
    );
    pdf.doc.objects.insert(form_id, lopdf::Object::Stream(form));
    let contents = pdf.stream(b"/Self Do");
    pdf.page(contents, xobjects(vec![("Self", form_id)]));
    let input = pdf.build();

    let table = table(&[([10000, 0, 0], [0, 10000, 10000, 0])]);
    let output = convert(&input, &table);
    assert_eq!(content_of(&output, form_id), b"0 1 1 0 k /Self Do".to_vec());
}

#[test]
fn test_shared_content_converted_once() {
    let mut pdf = PdfBuilder::new();
    let contents = pdf.stream(b"1 0 0 rg");
    pdf.page(contents, Dictionary::new());
    pdf.page(contents, Dictionary::new());
    let input = pdf.build();

    let table = table(&[([10000, 0, 0], [0, 10000, 10000, 0])]);
    let output = convert(&input, &table);
    assert_eq!(content_of(&output, contents), b"0 1 1 0 k".to_vec());
}

#[test]
fn test_second_pass_is_a_no_op() {
    let mut pdf = PdfBuilder::new();
    let contents = pdf.stream(b"1 0 0 rg 0 0 5 5 re f");
    pdf.page(contents, Dictionary::new());
    let input = pdf.build();

    let table = table(&[([10000, 0, 0], [0, 10000, 10000, 0])]);
    let once = convert(&input, &table);
    let twice = convert(&once, &table);
    assert_eq!(content_of(&once, contents), content_of(&twice, contents));
}

#[test]
fn test_compressed_output_roundtrips() {
    let mut pdf = PdfBuilder::new();
    let contents = pdf.stream(b"1 0 0 rg");
    pdf.page(contents, Dictionary::new());
    let input = pdf.build();

    let table = table(&[([10000, 0, 0], [0, 10000, 10000, 0])]);
    let output = CmykConverter::new(&table).convert(&input).unwrap();
    assert_eq!(content_of(&output, contents), b"0 1 1 0 k".to_vec());
}

#[test]
fn test_invalid_pdf_is_an_error() {
    let err = convert_cmyk_colors(b"not a pdf", &ColorTable::new(), false).unwrap_err();
    assert!(matches!(err, PressError::Pdf(_)));
}

#[test]
fn test_operator_split_across_contents_array() {
    let mut pdf = PdfBuilder::new();
    let head = pdf.stream(b"1 0 0");
    let tail = pdf.stream(b"rg 0 0 5 5 re f");
    pdf.page_with(dictionary! {
        "Contents" => vec![head.into(), tail.into()],
        "Resources" => Dictionary::new(),
    });
    let input = pdf.build();

    let table = table(&[([10000, 0, 0], [0, 10000, 10000, 0])]);
    let output = convert(&input, &table);
    let mut joined = content_of(&output, head);
    joined.push(b'\n');
    joined.extend(content_of(&output, tail));
    assert_eq!(joined, b"\n0 1 1 0 k 0 0 5 5 re f".to_vec());
}
